//! HTTP mapping for `MemoTrackError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use memotrack_core::error::{ClientCode, MemoTrackError};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub MemoTrackError);

impl From<MemoTrackError> for ApiError {
    fn from(e: MemoTrackError) -> Self {
        Self(e)
    }
}

pub fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::BadRequest
        | ClientCode::LabelMismatch
        | ClientCode::NegativeDelta
        | ClientCode::InvalidDescriptor => StatusCode::BAD_REQUEST,
        ClientCode::DuplicateName => StatusCode::CONFLICT,
        ClientCode::DataAccess => StatusCode::SERVICE_UNAVAILABLE,
        ClientCode::UnsupportedVersion | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, code = code.as_str(), "request failed");
        }
        let body = json!({ "error": { "code": code.as_str(), "message": self.0.to_string() } });
        (status, Json(body)).into_response()
    }
}
