//! Shared error type across memotrack crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Metric name registered twice.
    DuplicateName,
    /// Counter asked to go backwards.
    NegativeDelta,
    /// Label set does not match the metric's declared label names.
    LabelMismatch,
    /// Descriptor failed validation.
    InvalidDescriptor,
    /// Database unreachable or query failed.
    DataAccess,
    /// Entity does not exist.
    NotFound,
    /// Invalid input / malformed request.
    BadRequest,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::DuplicateName => "DUPLICATE_NAME",
            ClientCode::NegativeDelta => "NEGATIVE_DELTA",
            ClientCode::LabelMismatch => "LABEL_MISMATCH",
            ClientCode::InvalidDescriptor => "INVALID_DESCRIPTOR",
            ClientCode::DataAccess => "DATA_ACCESS",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MemoTrackError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MemoTrackError {
    #[error("metric already registered: {0}")]
    DuplicateName(String),
    #[error("counter delta must be non-negative, got {0}")]
    NegativeDelta(f64),
    #[error("label mismatch for {metric}: expected {expected:?}, got {got:?}")]
    LabelMismatch {
        metric: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("invalid metric descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("data access: {0}")]
    DataAccess(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MemoTrackError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MemoTrackError::DuplicateName(_) => ClientCode::DuplicateName,
            MemoTrackError::NegativeDelta(_) => ClientCode::NegativeDelta,
            MemoTrackError::LabelMismatch { .. } => ClientCode::LabelMismatch,
            MemoTrackError::InvalidDescriptor(_) => ClientCode::InvalidDescriptor,
            MemoTrackError::DataAccess(_) => ClientCode::DataAccess,
            MemoTrackError::NotFound(_) => ClientCode::NotFound,
            MemoTrackError::BadRequest(_) => ClientCode::BadRequest,
            MemoTrackError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            MemoTrackError::Internal(_) => ClientCode::Internal,
        }
    }
}
