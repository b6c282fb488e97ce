//! Error types shared by the worksheet layer and both pipelines.

use thiserror::Error;

/// Boxed error returned by port implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building worksheets or running a pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Sheet header did not match the expected ordered column list.
    #[error("Header mismatch: cannot create {sheet} from CSV: '{snippet}'")]
    SchemaMismatch {
        /// Export name of the sheet being built.
        sheet: String,
        /// Leading part of the offending text.
        snippet: String,
    },

    /// A date column held a value in neither accepted format.
    #[error("Could not parse {column} value: '{value}'")]
    DateFormat {
        /// Column name (`START_DATE` or `END_DATE`).
        column: String,
        /// The raw value.
        value: String,
    },

    /// A single call to an external system failed.
    #[error("{operation} failed: {message}")]
    ExternalCall {
        /// What was being attempted.
        operation: String,
        /// Failure description from the adapter.
        message: String,
    },

    /// Setup could not complete; the whole run is aborted.
    #[error("Fatal setup error: {message}")]
    FatalSetup {
        /// Failure description.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Failure description.
        message: String,
    },

    /// Delimited text could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an external call error.
    pub fn external(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ExternalCall { operation: operation.into(), message: message.to_string() }
    }

    /// Create a fatal setup error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::FatalSetup { message: message.into() }
    }

    /// Whether the error must abort the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalSetup { .. } | Self::Config { .. })
    }
}

/// Result alias for crate operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_message_includes_snippet() {
        let err = Error::SchemaMismatch { sheet: "instructors".into(), snippet: "A,B".into() };
        assert_eq!(err.to_string(), "Header mismatch: cannot create instructors from CSV: 'A,B'");
    }

    #[test]
    fn only_setup_and_config_errors_are_fatal() {
        assert!(Error::fatal("no token").is_fatal());
        assert!(!Error::external("list logins", "timeout").is_fatal());
        assert!(!Error::DateFormat { column: "END_DATE".into(), value: "x".into() }.is_fatal());
    }
}
