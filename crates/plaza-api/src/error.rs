use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use plaza_types::validate::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Per-field validation failures, rendered as `{"field": ["msg", ...]}`.
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Authentication(&'static str),

    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for ApiError {
    fn from(errs: FieldErrors) -> Self {
        ApiError::Validation(errs)
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errs) => {
                (StatusCode::BAD_REQUEST, Json(errs)).into_response()
            }
            ApiError::Authentication(msg) => detail(StatusCode::UNAUTHORIZED, msg),
            ApiError::PermissionDenied(msg) => detail(StatusCode::FORBIDDEN, msg),
            ApiError::NotFound => detail(StatusCode::NOT_FOUND, "Not found."),
            ApiError::Conflict(msg) => detail(StatusCode::CONFLICT, msg),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
