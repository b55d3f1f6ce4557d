//! Error types for ddlsync operations.

use thiserror::Error;

/// Render the source line that contains an error with a caret marker beneath
/// the offending text.
pub fn caret_snippet(line: &str, column: usize, width: usize) -> String {
    format!(
        "{}\n{}{}",
        line,
        " ".repeat(column),
        "^".repeat(width.max(1))
    )
}

/// All error types that ddlsync operations can produce.
#[derive(Error, Debug)]
pub enum DdlsyncError {
    /// Invalid or missing configuration (TOML parse errors, unreadable config file, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The tokenizer found input that matches no token type.
    #[error("{}:{}: unknown token {:?}:\n{snippet}", .line + 1, .column + 1, first_line(.literal))]
    UnknownToken {
        literal: String,
        line: usize,
        column: usize,
        snippet: String,
    },

    /// The parser found a token it did not expect at this point of a statement.
    #[error("{}:{}: {message}:\n{snippet}", .line + 1, .column + 1)]
    ParseError {
        message: String,
        line: usize,
        column: usize,
        snippet: String,
    },

    /// Parsed statements violate a schema rule, e.g. a table outside any database.
    #[error("Schema validation failed: {0}")]
    ValidationError(String),

    /// A filesystem I/O operation failed (reading schema files, config, etc.).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A report could not be rendered as JSON.
    #[error("Serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Convenience type alias for `Result<T, DdlsyncError>`.
pub type Result<T> = std::result::Result<T, DdlsyncError>;
