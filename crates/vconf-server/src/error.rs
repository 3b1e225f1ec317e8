//! API error taxonomy
//!
//! Every failure a handler can hit maps to exactly one [`ApiError`]
//! variant, and every variant renders as a JSON `{"error": "..."}` body.

use serde::{Deserialize, Serialize};
use vconf_document::DocumentError;
use vconf_store::StoreError;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

/// Request-level errors returned by the handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller input is missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Record store unreachable, timed out, or record absent
    #[error("upstream store error: {0}")]
    Upstream(String),

    /// Stored document text could not be parsed
    #[error("stored document is unreadable: {0}")]
    UpstreamData(#[source] DocumentError),

    /// Every update attempt lost a version race
    #[error("update abandoned after {attempts} attempts: record kept changing underneath")]
    UpstreamConflict {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Merged document could not be encoded
    #[error("failed to encode document: {0}")]
    Serialize(#[source] DocumentError),

    /// Request was cancelled before it completed
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Create validation error
    #[inline]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_)
            | Self::UpstreamData(_)
            | Self::UpstreamConflict { .. }
            | Self::Serialize(_)
            | Self::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Upstream(_) => "upstream",
            Self::UpstreamData(_) => "upstream_data",
            Self::UpstreamConflict { .. } => "upstream_conflict",
            Self::Serialize(_) => "serialize",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey { .. } => Self::Validation(err.to_string()),
            StoreError::Conflict { .. } => Self::UpstreamConflict { attempts: 1 },
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
}

impl ErrorBody {
    /// Create body from any message
    #[inline]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        Self::new(err.to_string())
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        reply::with_status(reply::json(&ErrorBody::from(&self)), self.status_code()).into_response()
    }
}
