use std::fmt::Display;

/// The broad category of a failure.
///
/// Every failure aborts the running deployment: the kind only helps callers
/// (and tests) tell apart why it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The options supplied to a command are malformed or incomplete.
    Validation,
    /// The artifact URI uses a scheme we cannot fetch from.
    UnsupportedScheme,
    /// A cloud provider control-plane call was rejected.
    Provider,
    /// A provider resource did not converge before its waiter gave up.
    ConvergenceTimeout,
    /// The distribution does not reference the deployed function.
    NoMatchingAssociation,
    /// The distribution update was accepted but its ETag did not change.
    StaleUpdate,
    /// A named resource (service, container, archive entry) does not exist.
    NotFound,
    /// The deployment artifact could not be read or rewritten.
    InvalidArtifact,
    /// A local read or a network transfer failed.
    Io,
    /// The process was interrupted before the command completed.
    Interrupted,
    Other,
}

#[derive(thiserror::Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    description: String,
    explanation: Option<String>,
    output: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

impl Error {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Other,
            description: description.into(),
            explanation: None,
            output: None,
            source: None,
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;

        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());

        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());

        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());

        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)?;

        if let Some(source) = self.source.as_ref() {
            write!(f, ": {}", source)?;
        }

        if let Some(explanation) = &self.explanation {
            write!(f, "\n\n{}", explanation)?;
        }

        if let Some(output) = &self.output {
            write!(f, "\n\n{}", output)?;
        }

        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Replaces the description of the error of a `Result`, keeping its kind.
pub trait ErrorContext {
    fn with_context(self, description: impl Into<String>) -> Self;
}

impl<T> ErrorContext for Result<T> {
    fn with_context(self, description: impl Into<String>) -> Self {
        self.map_err(|mut err| {
            err.description = description.into();
            err
        })
    }
}

#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::Error::new($msg))
    };
    ($err:expr $(,)?) => {
        return Err($crate::Error::new($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::new(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_explanation_and_output() {
        let err = Error::new("failed to update distribution")
            .with_kind(ErrorKind::StaleUpdate)
            .with_source(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            .with_explanation("The ETag did not change.")
            .with_output("old etag: E1");

        assert_eq!(err.kind(), ErrorKind::StaleUpdate);
        assert_eq!(
            err.to_string(),
            "failed to update distribution: boom\n\nThe ETag did not change.\n\nold etag: E1"
        );
    }

    #[test]
    fn test_with_context_keeps_kind_and_explanation() {
        let res: Result<()> = Err(Error::new("inner")
            .with_kind(ErrorKind::NotFound)
            .with_explanation("Something was missing."));
        let err = res.with_context("outer").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.description(), "outer");
        assert_eq!(err.explanation(), Some("Something was missing."));
    }

    #[test]
    fn test_bail() {
        fn fails() -> Result<()> {
            bail!("no {} here", "luck");
        }

        assert_eq!(fails().unwrap_err().description(), "no luck here");
    }
}
