//! Error types for OutputKit.
//!
//! Library crates use [`OutputKitError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all OutputKit operations.
#[derive(Debug, thiserror::Error)]
pub enum OutputKitError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Raw content could not be parsed into the expected shape.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input or value-range validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Rendering an output into a target format failed.
    #[error("format error: {0}")]
    Format(String),

    /// Template registration or rendering error.
    #[error("template error: {0}")]
    Template(String),

    /// JSON/YAML/CSV serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OutputKitError>;

impl OutputKitError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for OutputKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = OutputKitError::config("unknown schema preset");
        assert_eq!(err.to_string(), "config error: unknown schema preset");

        let err = OutputKitError::validation("no outputs provided for consolidation");
        assert!(err.to_string().contains("no outputs provided"));
    }

    #[test]
    fn json_errors_convert() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: OutputKitError = parse_err.into();
        assert!(err.to_string().starts_with("serialization error:"));
    }
}
