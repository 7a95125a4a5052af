/// Database layer
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded, reversible migrations (the typed description of
///   the same schema lives in [`crate::schema`])
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::db::pool::{create_pool, DatabaseConfig};
/// use nong_identity_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
