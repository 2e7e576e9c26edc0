//! Error types for variable resolution and loading.

use serde::Serialize;
use thiserror::Error;

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Message used when a required variable is absent from every consulted source.
pub const NOT_SET_MESSAGE: &str = "environment variable is not set properly";

/// Failure returned by a value parser.
#[derive(Debug, Error)]
pub enum CastError {
    /// The raw value is missing or malformed. Collected per key during resolution.
    #[error("{0}")]
    Invalid(String),

    /// The parser itself broke. Aborts resolution instead of being collected.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl CastError {
    /// Create an [`CastError::Invalid`] from a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        CastError::Invalid(message.into())
    }

    /// Error for a required value that no source provided.
    pub fn not_set() -> Self {
        CastError::Invalid(NOT_SET_MESSAGE.to_string())
    }

    /// Whether this is a configuration-data problem rather than a parser fault.
    pub fn is_invalid(&self) -> bool {
        matches!(self, CastError::Invalid(_))
    }
}

/// A single variable that failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{key} is invalid: {message}")]
pub struct ParseError {
    /// Variable name.
    pub key: String,
    /// Cause reported by the parser.
    pub message: String,
}

impl ParseError {
    /// Create a parse error for `key`.
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Every [`ParseError`] produced by one resolution run, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "There were {count} errors while parsing. [{messages}]",
    count = .errors.len(),
    messages = join_messages(.errors)
)]
pub struct CombinedResolutionError {
    errors: Vec<ParseError>,
}

impl CombinedResolutionError {
    /// Wrap a list of per-key failures.
    pub fn new(errors: Vec<ParseError>) -> Self {
        Self { errors }
    }

    /// The individual failures, in declaration order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Number of failed variables.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of the failed variables.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.key.as_str())
    }

    /// Consume into the list of failures.
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}

impl IntoIterator for CombinedResolutionError {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

fn join_messages(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of one resolution run.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// One or more variables were missing or invalid.
    #[error(transparent)]
    Combined(#[from] CombinedResolutionError),

    /// A parser faulted while handling `key`.
    #[error("Parser for {key} failed: {source}")]
    Parser {
        /// Variable being resolved when the fault happened.
        key: String,
        /// Error raised by the parser.
        #[source]
        source: anyhow::Error,
    },
}

impl ResolveError {
    /// The aggregated per-key failures, if this is a data error.
    pub fn combined(&self) -> Option<&CombinedResolutionError> {
        match self {
            ResolveError::Combined(combined) => Some(combined),
            ResolveError::Parser { .. } => None,
        }
    }
}

/// Errors that can occur while assembling a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Resolution of the declared variables failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A variable file exists but could not be read or parsed.
    #[cfg(feature = "loader")]
    #[error("Failed to load variables from {path:?}: {source}")]
    File {
        /// File being read.
        path: std::path::PathBuf,
        /// Underlying dotenv error.
        #[source]
        source: dotenvy::Error,
    },

    /// I/O error outside of file parsing, e.g. resolving the working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CombinedResolutionError> for ConfigError {
    fn from(err: CombinedResolutionError) -> Self {
        ConfigError::Resolve(ResolveError::Combined(err))
    }
}

impl ConfigError {
    /// The aggregated per-key failures, if resolution failed on data.
    pub fn combined(&self) -> Option<&CombinedResolutionError> {
        match self {
            ConfigError::Resolve(err) => err.combined(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = ParseError::new("PORT", "Non-number value found: abc");
        assert_eq!(err.to_string(), "PORT is invalid: Non-number value found: abc");
    }

    #[test]
    fn test_combined_message_lists_count_and_causes() {
        let err = CombinedResolutionError::new(vec![
            ParseError::new("A", NOT_SET_MESSAGE),
            ParseError::new("B", "Non-boolean value found: yes"),
        ]);

        assert_eq!(
            err.to_string(),
            "There were 2 errors while parsing. [A is invalid: environment variable is not set properly, B is invalid: Non-boolean value found: yes]"
        );
        assert_eq!(err.len(), 2);
        assert_eq!(err.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_cast_error_kinds() {
        assert!(CastError::not_set().is_invalid());
        assert!(!CastError::from(anyhow::anyhow!("boom")).is_invalid());
    }

    #[test]
    fn test_config_error_exposes_combined() {
        let err = ConfigError::from(CombinedResolutionError::new(vec![ParseError::new(
            "A", "bad",
        )]));
        assert_eq!(err.combined().map(|c| c.len()), Some(1));

        let fault = ConfigError::Resolve(ResolveError::Parser {
            key: "A".to_string(),
            source: anyhow::anyhow!("boom"),
        });
        assert!(fault.combined().is_none());
        assert_eq!(fault.to_string(), "Parser for A failed: boom");
    }
}
