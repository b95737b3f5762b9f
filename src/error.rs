//! Error taxonomy for the generation-validate-execute pipeline.
//!
//! Every stage fails fast with exactly one of these kinds and the failure
//! propagates unmodified to the caller. There are no retries and no
//! partial-success states.

use std::path::PathBuf;

/// Errors produced by the script pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No completion provider is usable (missing API key, bad setup).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A candidate script violated one rule of the structural contract.
    /// The message names the specific rule, never a generic "invalid".
    #[error("script validation failed: {0}")]
    Validation(String),

    /// The candidate script does not parse as Python. Kept distinct from
    /// `Validation` so callers can tell a garbled generation from a
    /// well-formed but non-compliant one.
    #[error("script syntax error: {0}")]
    Syntax(String),

    /// The persisted script could not be bound as an invocable unit,
    /// either because the interpreter failed to start or because the
    /// module raised at import time.
    #[error("failed to load generated script: {0}")]
    Load(String),

    /// The loaded unit defines none of the supported entry-point names.
    #[error("generated script defines no supported entry point ({0})")]
    MissingEntryPoint(String),

    /// The invoked entry point raised. Names the transient file so the
    /// ephemeral source can be inspected before cleanup races it away.
    #[error("error executing script from temporary file {path}: {message}", path = .path.display())]
    Execution { path: PathBuf, message: String },

    /// The completion provider returned a transport or protocol failure.
    #[error("completion provider error: {0}")]
    Provider(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(rule: impl Into<String>) -> Self {
        Self::Validation(rule.into())
    }

    pub fn execution(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Execution {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
