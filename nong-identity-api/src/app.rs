/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use nong_identity_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = nong_identity_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{self, ApiError},
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use nong_identity_shared::auth::authorization::AuthorizationPolicy;
use nong_identity_shared::auth::jwt::TokenValidation;
use nong_identity_shared::auth::middleware::{jwt_auth_middleware, policy_middleware};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// What bearer tokens must satisfy
    pub validation: Arc<TokenValidation>,

    /// Policy guarding the claims endpoints
    pub policy: Arc<AuthorizationPolicy>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let validation = Arc::new(config.token_validation());
        let policy = Arc::new(config.authorization_policy());

        Self {
            db,
            config: Arc::new(config),
            validation,
            policy,
        }
    }

    /// Replaces the configured policy
    pub fn with_policy(mut self, policy: AuthorizationPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health               # Health check (public)
/// ├── GET /home                 # Caller's claims (bearer token + SomePolicy)
/// ├── GET /home/list            # Same as /home
/// └── *                         # JSON 404
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication then policy (claims routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Claims routes: the JWT layer is outermost so the policy sees a principal
    let home_routes = Router::new()
        .route("/home", get(routes::home::list_claims))
        .route("/home/list", get(routes::home::list_claims))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            policy_layer,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(health_routes)
        .merge(home_routes)
        .fallback(error::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS for the configured origins
///
/// `*` anywhere in the list, or no list outside production, allows any origin.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins = &config.api.cors_origins;

    if origins.iter().any(|o| o == "*") || (origins.is_empty() && !config.api.production) {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the bearer token and stores the caller's principal
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    jwt_auth_middleware(state.validation.clone(), req, next)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::from(e)
        })
}

/// Evaluates the configured policy against the stored principal
async fn policy_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    policy_middleware(state.policy.clone(), req, next)
        .await
        .map_err(ApiError::from)
}
