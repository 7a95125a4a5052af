/// Database migration runner
///
/// Migrations are embedded from `migrations/` at compile time. Every migration
/// is reversible: `{version}_{name}.up.sql` applies it and
/// `{version}_{name}.down.sql` undoes it. Versions line up with
/// [`crate::schema::catalog`].
///
/// # Example
///
/// ```no_run
/// use nong_identity_shared::db::pool::{create_pool, DatabaseConfig};
/// use nong_identity_shared::db::migrations::{get_migration_status, revert_migrations_to, run_migrations};
/// use nong_identity_shared::schema::catalog::AUDIT_LOG_CREATED_TIMESTAMPTZ;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::with_url(std::env::var("DATABASE_URL")?)).await?;
///
///     run_migrations(&pool).await?;
///
///     // Roll the profile columns back off "Users"
///     revert_migrations_to(&pool, AUDIT_LOG_CREATED_TIMESTAMPTZ).await?;
///
///     let status = get_migration_status(&pool).await?;
///     println!("{} applied, {} pending", status.applied_migrations, status.pending_migrations);
///     Ok(())
/// }
/// ```

use sqlx::{
    migrate::{MigrateDatabase, MigrateError, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, info, warn};

/// Embedded migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Number of migrations that have been applied
    pub applied_migrations: usize,

    /// Number of embedded migrations not applied yet
    pub pending_migrations: usize,

    /// Latest applied migration version
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Versions of the embedded up-migrations, ascending
pub fn embedded_versions() -> Vec<i64> {
    let mut versions: Vec<i64> = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .collect();
    versions.sort_unstable();
    versions.dedup();
    versions
}

/// Runs all pending database migrations
///
/// Each migration runs in its own transaction; a failing migration is rolled
/// back and reported.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Starting database migrations");

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Reverts applied migrations newer than `target`
///
/// After this call the latest applied version is `target` (or nothing, for a
/// target older than the first migration).
pub async fn revert_migrations_to(pool: &PgPool, target: i64) -> Result<(), MigrateError> {
    info!(target, "Reverting database migrations");

    match MIGRATOR.undo(pool, target).await {
        Ok(()) => {
            info!(target, "Migrations reverted");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, target, "Migration revert failed");
            Err(e)
        }
    }
}

/// Gets the current migration status
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    debug!("Checking migration status");

    let embedded = embedded_versions();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            pending_migrations: embedded.len(),
            latest_version: None,
            is_up_to_date: embedded.is_empty(),
        });
    }

    let applied: Vec<i64> = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = true ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    let pending = embedded.iter().filter(|v| !applied.contains(v)).count();

    debug!(
        applied_migrations = applied.len(),
        pending_migrations = pending,
        "Migration status retrieved"
    );

    Ok(MigrationStatus {
        applied_migrations: applied.len(),
        pending_migrations: pending,
        latest_version: applied.last().copied(),
        is_up_to_date: pending == 0,
    })
}

/// Creates the database if it doesn't exist
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}

/// Drops the database
///
/// ⚠️  Deletes all data. Intended for test databases only.
pub async fn drop_database(database_url: &str) -> Result<(), sqlx::Error> {
    warn!("Dropping database");

    if Postgres::database_exists(database_url).await? {
        Postgres::drop_database(database_url).await?;
        info!("Database dropped");
    }

    Ok(())
}
