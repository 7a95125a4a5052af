/// Health check endpoint
///
/// Reports whether the server is running and can reach the database.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 0, "idle_connections": 2, "total_connections": 2 }
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use nong_identity_shared::db::pool::{self, PoolStats};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    pub pool: PoolStats,
}

/// Health check handler
///
/// Answers 503 with `"degraded"` while the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match pool::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        pool: pool::get_pool_stats(&state.db),
    };

    (status, Json(body))
}
