use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use randex_core::AssetError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Logical request failure. The wire contract keeps HTTP 200 and signals
/// failure through `code: 0` in the JSON envelope.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": 0,
            "error": self.message,
        }));

        (StatusCode::OK, body).into_response()
    }
}

impl From<AssetError> for ApiError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InvalidCount(_)
            | AssetError::CategoryNotFound(_)
            | AssetError::InsufficientItems { .. } => Self::new(err.to_string()),
            other => {
                tracing::error!(%other, "asset engine failure");
                Self::new("internal error")
            }
        }
    }
}
