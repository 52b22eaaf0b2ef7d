use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::auth::{
    dto::{ErrorsBody, FieldError, MessageBody},
    repo_types::StoreError,
};

pub const USER_EXISTS: &str = "User already exists";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Everything the account endpoints can fail with. Only the variant crosses
/// the HTTP boundary; inner detail is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),
    #[error("user already exists")]
    Conflict,
    #[error("invalid email or password")]
    Unauthorized,
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists => AccountError::Conflict,
            other => AccountError::Store(other),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AccountError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorsBody { errors })).into_response();
            }
            AccountError::Conflict => (StatusCode::CONFLICT, USER_EXISTS),
            AccountError::Unauthorized => (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS),
            AccountError::Store(e) => {
                error!(error = %e, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
            AccountError::Internal(e) => {
                error!(error = %e, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        };
        (status, Json(MessageBody { message })).into_response()
    }
}
