//! Error types for Briefwire.
//!
//! Library crates use [`BriefwireError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// How a persistence failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceErrorKind {
    /// Lock contention, deadlock, serialization failure. Safe to retry.
    Transient,
    /// The target schema lacks optional columns the write expected.
    SchemaDrift,
    /// Anything else.
    Fatal,
}

impl std::fmt::Display for PersistenceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transient => "transient",
            Self::SchemaDrift => "schema drift",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Top-level error type for all Briefwire operations.
#[derive(Debug, thiserror::Error)]
pub enum BriefwireError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a feed or an article page.
    #[error("network error: {0}")]
    Network(String),

    /// A feed body could not be parsed as RSS or Atom.
    #[error("feed parse error: {message}")]
    FeedParse { message: String },

    /// Article HTML could not be turned into usable content.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Database error outside of a classified write (open, migrate, read).
    #[error("storage error: {0}")]
    Storage(String),

    /// A classified database write failure, tagged with the operation name.
    #[error("{operation} failed ({kind}): {message}")]
    Persistence {
        operation: String,
        kind: PersistenceErrorKind,
        message: String,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad catalog entry, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BriefwireError>;

impl BriefwireError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a feed parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::FeedParse {
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

    /// Create a classified persistence error for `operation`.
    pub fn persistence(
        operation: impl Into<String>,
        kind: PersistenceErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Persistence {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// The persistence classification, if this is a persistence error.
    pub fn persistence_kind(&self) -> Option<PersistenceErrorKind> {
        match self {
            Self::Persistence { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
