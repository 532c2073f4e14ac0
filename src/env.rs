//! Parsing of `KEY=VALUE` environment assignments given on the command line.

use indexmap::IndexMap;

use crate::{Error, ErrorKind, Result};

/// Environment variables in the order they were declared.
pub type EnvVars = IndexMap<String, String>;

/// Parses a list of environment assignments.
///
/// The assignments are joined with spaces before being parsed, so a single
/// argument may hold several of them (`"A=1 B=2"`). Values may be wrapped in
/// single or double quotes to hold whitespace; inside double quotes, `\"`
/// and `\\` are unescaped. A key assigned twice keeps its first position and
/// its last value.
pub fn parse_env_assignments<I, S>(assignments: I) -> Result<EnvVars>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let input = assignments
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ");

    let mut vars = EnvVars::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();

        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }

        if chars.next_if_eq(&'=').is_none() {
            return Err(invalid_assignment(&key, "it is missing an `=` sign"));
        }

        if key.is_empty() {
            return Err(invalid_assignment(&key, "the variable name is empty"));
        }

        let value = match chars.peek() {
            Some(&quote) if quote == '"' || quote == '\'' => {
                chars.next();

                let mut value = String::new();
                let mut closed = false;

                while let Some(c) = chars.next() {
                    match c {
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        '\\' if quote == '"' => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => value.push(escaped),
                            Some(other) => {
                                value.push('\\');
                                value.push(other);
                            }
                            None => value.push('\\'),
                        },
                        c => value.push(c),
                    }
                }

                if !closed {
                    return Err(invalid_assignment(&key, "its quoted value is not closed"));
                }

                value
            }
            _ => {
                let mut value = String::new();

                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    value.push(c);
                }

                value
            }
        };

        vars.insert(key, value);
    }

    Ok(vars)
}

fn invalid_assignment(key: &str, reason: &str) -> Error {
    Error::new("invalid environment assignment")
        .with_kind(ErrorKind::Validation)
        .with_explanation(format!(
            "The environment assignment starting with `{}` is invalid: {}. Assignments must be written as `KEY=VALUE`.",
            key, reason
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_assignments() {
        let vars =
            parse_env_assignments(["A=1", "B=two C='with space'", r#"D="x\"y""#, "E="]).unwrap();

        assert_eq!(
            vars.iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect::<Vec<_>>(),
            vec![
                ("A", "1"),
                ("B", "two"),
                ("C", "with space"),
                ("D", "x\"y"),
                ("E", ""),
            ]
        );
    }

    #[test]
    fn test_parse_env_assignments_keeps_first_position() {
        let vars = parse_env_assignments(["A=1 B=2 A=3"]).unwrap();

        assert_eq!(vars.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(vars["A"], "3");
    }

    #[test]
    fn test_parse_env_assignments_empty() {
        assert!(parse_env_assignments(Vec::<String>::new())
            .unwrap()
            .is_empty());
        assert!(parse_env_assignments(["   "]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_env_assignments_invalid() {
        for input in ["NOVALUE", "=1", "A=\"open"] {
            let err = parse_env_assignments([input]).unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Validation, "input: {}", input);
        }
    }
}
