//! # Error Types
//!
//! This module defines all error types produced by the compile/resolve/render/export
//! pipeline.
//!
//! All errors that have a natural source location (parse errors, resolution errors)
//! carry it, so callers can print a one-line diagnostic of the form
//! `<module>:<line>:<col>: <level>: <message>` without re-deriving context.
//!
//! ## Error Types
//! - `Parse` - lexer/parser errors with line and column information
//! - `Validation` - score-level validation failures (bad wave volume, channel-level bpm, ...)
//! - `Resolution` - resolver failures (cyclic references, unresolvable names)
//! - `Export` - exporter failures (strict-mode violations)
//! - `Import` - instrument import failures (missing file, cycle, size cap, policy)
//! - `Io` - wrapped filesystem/network error
//!
//! ## Usage
//! ```
//! use gbscore::GbscoreError;
//!
//! let err = GbscoreError::Parse {
//!     line: 5,
//!     column: 10,
//!     message: "unexpected token 'x'".to_string(),
//! };
//! assert_eq!(err.to_string(), "score:5:10: error: unexpected token 'x'");
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GbscoreError {
    /// Hard failure during tokenization or parsing.
    #[error("score:{line}:{column}: error: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A score-level value fails validation (bad wave volume, channel-level bpm, ...).
    #[error("score: error: {context}: {message}")]
    Validation { context: String, message: String },

    /// Failure while walking a channel's token stream into events.
    #[error("score: channel {channel}, token {index}: error: {message}")]
    Resolution {
        channel: u8,
        index: usize,
        message: String,
    },

    /// An exporter refuses to emit a construct it cannot represent faithfully.
    #[error("{format}: error: {message}")]
    Export { format: &'static str, message: String },

    /// An `import "..."` line could not be resolved.
    #[error("import {path}: error: {cause}")]
    Import { path: String, cause: String },

    /// Wrapped underlying filesystem or network error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-fatal diagnostic collected alongside a successful pipeline result.
///
/// Warnings are never dropped silently: every function that can produce one
/// returns `(T, Vec<Warning>)` on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub context: String,
    pub message: String,
}

impl Warning {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "score: {}: warning: {}", self.context, self.message)
    }
}

pub type Result<T> = std::result::Result<T, GbscoreError>;
