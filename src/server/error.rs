//! Mapping of service errors onto HTTP responses.

use crate::errors::ErrorKind;
use crate::protocol::models::ErrorBody;
use crate::TokenServerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// A [`TokenServerError`] on its way back to the caller.
#[derive(Debug)]
pub struct ApiError(pub TokenServerError);

impl From<TokenServerError> for ApiError {
    fn from(err: TokenServerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.kind() == ErrorKind::Internal {
            tracing::error!("Internal error: {}", self.0);
        }

        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// Result type of every handler.
pub type ApiResult<T> = Result<T, ApiError>;
