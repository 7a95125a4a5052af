/// Authentication middleware for Axum
///
/// Two layers guard protected routes:
///
/// - **JWT Middleware**: validates the `Authorization: Bearer <token>` header
///   and stores the caller's [`Principal`] in the request extensions
/// - **Policy Middleware**: evaluates an [`AuthorizationPolicy`] against that
///   principal
///
/// Missing or invalid credentials answer `401 Unauthorized`; a principal that
/// fails the policy answers `403 Forbidden`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use nong_identity_shared::auth::authorization::AuthorizationPolicy;
/// use nong_identity_shared::auth::claims::Principal;
/// use nong_identity_shared::auth::jwt::TokenValidation;
/// use nong_identity_shared::auth::middleware::{create_jwt_middleware, create_policy_middleware};
///
/// async fn whoami(principal: Principal) -> String {
///     principal.subject().unwrap_or("anonymous").to_string()
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(create_policy_middleware(
///         AuthorizationPolicy::new("SomePolicy").require_scope("roles"),
///     )))
///     .layer(middleware::from_fn(create_jwt_middleware(TokenValidation::new(
///         "your-jwt-secret",
///     ))));
/// ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use super::authorization::{AuthorizationPolicy, AuthzError};
use super::claims::Principal;
use super::jwt::{validate_token, JwtError, TokenValidation};

/// Boxed future returned by the middleware closures
pub type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    /// Authenticated, but the policy rejected the caller
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthzError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidFormat(_)
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match self {
            AuthError::Forbidden(_) => "forbidden",
            _ => "unauthorized",
        };

        let mut response = (
            status,
            Json(json!({
                "error": error,
                "message": self.to_string(),
            })),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    Ok(token.trim())
}

/// JWT authentication middleware
///
/// Adds the caller's [`Principal`] to the request extensions on success.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing
/// - The header is not a bearer token
/// - Token validation fails
pub async fn jwt_auth_middleware(
    validation: Arc<TokenValidation>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;

    let principal = validate_token(token, &validation).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken(e)
    })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Policy middleware
///
/// Must run inside [`jwt_auth_middleware`]; a request without a principal is
/// treated as unauthenticated.
pub async fn policy_middleware(
    policy: Arc<AuthorizationPolicy>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .ok_or(AuthError::MissingCredentials)?;

    if let Err(e) = policy.evaluate(principal) {
        debug!(policy = %policy.name, error = %e, "Authorization policy failed");
        return Err(AuthError::Forbidden(e));
    }

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// For use with `axum::middleware::from_fn`.
pub fn create_jwt_middleware(
    validation: TokenValidation,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    let validation = Arc::new(validation);
    move |req, next| {
        let validation = validation.clone();
        Box::pin(jwt_auth_middleware(validation, req, next))
    }
}

/// Creates a policy middleware closure
///
/// For use with `axum::middleware::from_fn`.
pub fn create_policy_middleware(
    policy: AuthorizationPolicy,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    let policy = Arc::new(policy);
    move |req, next| {
        let policy = policy.clone();
        Box::pin(policy_middleware(policy, req, next))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
