use std::{fmt::Display, io::Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub const ACTION_STEP_COLOR: Color = Color::Green;
pub const IGNORE_STEP_COLOR: Color = Color::Yellow;
pub const ERROR_STEP_COLOR: Color = Color::Red;

const ACTION_WIDTH: usize = 12;

fn padding(action: &str) -> String {
    " ".repeat(ACTION_WIDTH.saturating_sub(action.len()))
}

/// Prints a cargo-like status line: a right-aligned verb followed by a
/// description. Colors are only used when stdout is a terminal.
pub fn print_step(color: Color, action: &str, description: impl Display) {
    if atty::is(atty::Stream::Stdout) {
        let mut stdout = StandardStream::stdout(ColorChoice::Always);

        // Terminal output is best-effort: a closed stdout must not abort a deployment.
        let _ = write_colored(&mut stdout, color, action, &description);
    } else {
        println!("{}{} {}", padding(action), action, description);
    }
}

/// Prints a fatal error to stderr in the same format as the status lines.
pub fn print_error(description: impl Display) {
    if atty::is(atty::Stream::Stderr) {
        let mut stderr = StandardStream::stderr(ColorChoice::Always);

        let _ = write_colored(&mut stderr, ERROR_STEP_COLOR, "error", &description);
    } else {
        eprintln!("error: {}", description);
    }
}

fn write_colored(
    stream: &mut StandardStream,
    color: Color,
    action: &str,
    description: &dyn Display,
) -> std::io::Result<()> {
    stream.set_color(
        ColorSpec::new()
            .set_fg(Some(color))
            .set_intense(true)
            .set_bold(true),
    )?;

    if color == ERROR_STEP_COLOR {
        write!(stream, "{}:", action)?;
    } else {
        write!(stream, "{}{}", padding(action), action)?;
    }

    stream.reset()?;
    writeln!(stream, " {}", description)
}

#[macro_export]
macro_rules! action_step {
    ($action:expr, $description:expr $(,)?) => {
        $crate::term::print_step($crate::term::ACTION_STEP_COLOR, $action, $description)
    };
    ($action:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::action_step!($action, format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ignore_step {
    ($action:expr, $description:expr $(,)?) => {
        $crate::term::print_step($crate::term::IGNORE_STEP_COLOR, $action, $description)
    };
    ($action:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::ignore_step!($action, format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padding("Updating"), "    ");
        assert_eq!(padding("Waiting-for-ever"), "");
    }
}
