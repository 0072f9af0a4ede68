/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Component errors from the shared
/// crate convert into [`ApiError`] through `From`, so handlers use `?`
/// throughout.
///
/// Error bodies carry a single field:
///
/// ```json
/// { "message": "User does not exist" }
/// ```
///
/// Internal errors are logged and replaced with a generic message.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use streamhub_shared::{
    auth::{middleware::SessionError, tokens::TokenError},
    credentials::CredentialError,
    media::MediaError,
    profile::ProfileError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing credential, bad login or rejected refresh token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid session token (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate username or email (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Media upload failed (500, message shown to the client)
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UploadFailed(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UploadFailed(msg) => msg,
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                "Something went wrong".to_string()
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Validation(msg) => ApiError::BadRequest(msg),
            CredentialError::Conflict { .. } => {
                ApiError::Conflict("User with email or username already exists".to_string())
            }
            CredentialError::NotFound => ApiError::NotFound("User does not exist".to_string()),
            CredentialError::InvalidPassword => {
                ApiError::BadRequest("Invalid old password".to_string())
            }
            other @ (CredentialError::Password(_)
            | CredentialError::Store(_)
            | CredentialError::Blocking(_)) => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken(e) => {
                tracing::debug!(reason = %e, "Rejected refresh token");
                ApiError::Unauthorized("Invalid refresh token".to_string())
            }
            TokenError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            TokenError::Credentials(e) => e.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthenticated => ApiError::Unauthorized(err.to_string()),
            SessionError::InvalidToken(_) => ApiError::Forbidden(err.to_string()),
            SessionError::Internal(detail) => ApiError::InternalError(detail),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::MissingUsername => ApiError::BadRequest(err.to_string()),
            ProfileError::NotFound => ApiError::NotFound(err.to_string()),
            ProfileError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Empty => ApiError::BadRequest(err.to_string()),
            MediaError::Io(e) => ApiError::InternalError(format!("Media storage failed: {}", e)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
