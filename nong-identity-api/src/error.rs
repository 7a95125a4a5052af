/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// The authentication layers and the router fallback return `ApiError`, which
/// converts to the matching HTTP status with a JSON
/// `{"error": ..., "message": ...}` body.
///
/// # Example
///
/// ```
/// use nong_identity_api::error::{ApiError, ApiResult};
/// use axum::Json;
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<String>> {
///     let name = name.ok_or_else(|| ApiError::NotFound("No such user".to_string()))?;
///     Ok(Json(name))
/// }
/// ```

use axum::{
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use nong_identity_shared::auth::authorization::AuthzError;
use nong_identity_shared::auth::jwt::JwtError;
use nong_identity_shared::auth::middleware::AuthError;
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "unauthorized", "forbidden")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_code, message) = match self {
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::Forbidden(msg) => ("forbidden", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidToken(e) => e.into(),
            AuthError::Forbidden(e) => e.into(),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Router fallback for paths with no route
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
