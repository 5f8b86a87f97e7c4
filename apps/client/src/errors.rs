use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failure to get any response out of the transport.
///
/// Cloneable so a single failed call can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(Arc::new(e))
    }
}

/// Error returned by every call made through `ApiClient`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("API error (status {status})")]
    Status { status: StatusCode, body: Bytes },

    /// The call was collapsed onto another caller's in-flight request, which
    /// failed with the wrapped error.
    #[error("{0} (shared in-flight request)")]
    Deduplicated(Box<ApiError>),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("Request task aborted: {0}")]
    Aborted(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Json(Arc::new(e))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Wraps an error observed by a caller that joined someone else's request.
    pub(crate) fn shared(self) -> Self {
        match self {
            ApiError::Deduplicated(_) => self,
            other => ApiError::Deduplicated(Box::new(other)),
        }
    }

    /// The error as the underlying call produced it.
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Deduplicated(inner) => inner.root(),
            other => other,
        }
    }

    pub fn is_deduplicated(&self) -> bool {
        matches!(self, ApiError::Deduplicated(_))
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root() {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The backend's `{"message": ...}` field, when the error body carries one.
    pub fn message(&self) -> Option<String> {
        match self.root() {
            ApiError::Status { body, .. } => serde_json::from_slice::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.message),
            _ => None,
        }
    }
}

/// Persisted key-value storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    LoginFailed(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
