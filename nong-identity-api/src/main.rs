//! # Nong Identity API Server
//!
//! Serves `GET /home` (the authenticated caller's claims) and `GET /health`.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/identity_admin \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p nong-identity-api
//! ```

use nong_identity_api::{
    app::{build_router, AppState},
    config::Config,
};
use nong_identity_shared::db::{migrations, pool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nong_identity_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Nong Identity API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db = pool::create_pool(config.pool_config()).await?;

    if config.database.run_migrations {
        migrations::run_migrations(&db).await?;
    } else {
        let status = migrations::get_migration_status(&db).await?;
        if !status.is_up_to_date {
            tracing::warn!(
                pending = status.pending_migrations,
                "Database has pending migrations and RUN_MIGRATIONS is off"
            );
        }
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(db.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, exiting...");
    pool::close_pool(db).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
