//! Error types for cache operations.

use std::path::{Path, PathBuf};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Which kind of name failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// An entry key.
    Key,
    /// A tag name.
    Tag,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => f.write_str("key"),
            Self::Tag => f.write_str("tag"),
        }
    }
}

/// Codec failure while encoding or decoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON (de)serialization failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload is not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// Failure reported by a user-supplied codec.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// Error returned by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A key or tag contains characters outside `[A-Za-z0-9-_.@]`.
    #[error("bad {kind} format: {name:?}")]
    InvalidNameFormat {
        /// Whether the rejected name was a key or a tag.
        kind: NameKind,
        /// The rejected name.
        name: String,
    },

    /// The cache root is missing or not a directory.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A blocking lock acquisition failed for a reason other than contention.
    #[error("can't get exclusive lock on {}: {source}", path.display())]
    LockUnavailable {
        /// Lock file path.
        path: PathBuf,
        /// Underlying error from the lock call.
        source: std::io::Error,
    },

    /// `acquire` was called on a lock this instance already holds.
    #[error("lock {} is already held by this instance", .0.display())]
    AlreadyHeld(PathBuf),

    /// The record on disk belongs to a different key.
    #[error("loaded {expected:?} but got content of {found:?}")]
    KeyMismatch {
        /// Requested key.
        expected: String,
        /// Key found in the record header.
        found: String,
    },

    /// The record header could not be parsed.
    #[error("corrupt record at {}: {reason}", path.display())]
    CorruptRecord {
        /// Entry file path.
        path: PathBuf,
        /// What was wrong with the header.
        reason: String,
    },

    /// The content producer failed.
    #[error("producer failed: {0}")]
    Producer(Box<dyn std::error::Error + Send + Sync>),

    /// The payload codec failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Filesystem I/O error.
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// Short description of the operation (e.g. "open entry").
        operation: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl CacheError {
    /// Create an I/O error with path and operation context.
    #[must_use]
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            operation,
            source,
        }
    }

    /// Downcast a producer failure to its concrete error type.
    #[must_use]
    pub fn producer_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Producer(source) => source.downcast_ref(),
            _ => None,
        }
    }

    /// True if this error is recoverable by overwriting the entry.
    pub(crate) fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptRecord { .. } | Self::Codec(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("render failed")]
    struct RenderError;

    #[test]
    fn test_producer_error_downcast() {
        let err = CacheError::Producer(Box::new(RenderError));
        assert!(err.producer_error::<RenderError>().is_some());
        assert!(err.producer_error::<std::io::Error>().is_none());
        assert_eq!(err.to_string(), "producer failed: render failed");
    }

    #[test]
    fn test_invalid_name_display() {
        let err = CacheError::InvalidNameFormat {
            kind: NameKind::Tag,
            name: "a b".to_owned(),
        };
        assert_eq!(err.to_string(), "bad tag format: \"a b\"");
    }

    #[test]
    fn test_io_error_display_includes_operation_and_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CacheError::io("open entry", "/cache/data/ab/cd/key:6b", source);
        let message = err.to_string();
        assert!(message.starts_with("failed to open entry /cache/data/ab/cd/key:6b"));
        assert!(!err.is_corruption());
    }
}
