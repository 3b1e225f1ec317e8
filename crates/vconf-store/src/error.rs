//! Error types for record stores

use std::path::PathBuf;

use crate::record::{RecordKey, VersionToken};

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record under this key
    #[error("record {0} not found")]
    NotFound(RecordKey),

    /// Record already exists (create only)
    #[error("record {0} already exists")]
    AlreadyExists(RecordKey),

    /// Record changed since it was read (optimistic concurrency failure)
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    Conflict {
        /// Record being patched
        key: RecordKey,
        /// Version the caller read
        expected: VersionToken,
        /// Version currently stored
        actual: VersionToken,
    },

    /// Namespace or name cannot address a record in this store
    #[error("invalid record key {key}: {reason}")]
    InvalidKey {
        /// Offending key
        key: RecordKey,
        /// Why it was rejected
        reason: String,
    },

    /// Stored record could not be decoded
    #[error("corrupt record {key}: {message}")]
    Corrupt {
        /// Affected record
        key: RecordKey,
        /// Decoder message
        message: String,
    },

    /// IO failure in a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store unreachable or failed internally
    #[error("store transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Create conflict error
    pub fn conflict(key: &RecordKey, expected: &VersionToken, actual: &VersionToken) -> Self {
        Self::Conflict {
            key: key.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the whole read-modify-write cycle may be retried
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let key = RecordKey::new("ns", "cm");
        let err = StoreError::conflict(&key, &VersionToken::from(1), &VersionToken::from(2));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "version conflict on ns/cm: expected 1, found 2");
    }

    #[test]
    fn not_found_is_terminal() {
        let err = StoreError::NotFound(RecordKey::new("ns", "cm"));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "record ns/cm not found");
    }
}
