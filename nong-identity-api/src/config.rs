/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply pending migrations on startup (default: true)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: none)
/// - `JWT_SECRET`: HS256 secret for bearer tokens (required, 32+ characters)
/// - `JWT_ISSUER`: Required token issuer (optional)
/// - `JWT_AUDIENCE`: Required token audience (optional)
/// - `AUTH_REQUIRED_SCOPE`: Scope demanded by `SomePolicy` (optional)
/// - `RUST_LOG`: Log level (default: nong_identity_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use nong_identity_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use nong_identity_shared::auth::authorization::{AuthorizationPolicy, DEFAULT_POLICY_NAME};
use nong_identity_shared::auth::jwt::TokenValidation;
use nong_identity_shared::db::pool;
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Bearer token and policy configuration
    pub auth: AuthConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode: HSTS header and no permissive CORS
    pub production: bool,

    /// Allowed CORS origins; empty means same-origin only in production and
    /// any origin otherwise
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

/// Bearer token and policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    pub issuer: Option<String>,

    pub audience: Option<String>,

    /// Scope required by the claims endpoints' policy
    pub required_scope: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_host = non_empty("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = non_empty("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;
        let production = parse_bool("API_PRODUCTION", non_empty("API_PRODUCTION"), false)?;
        let cors_origins = non_empty("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = non_empty("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let run_migrations = parse_bool("RUN_MIGRATIONS", non_empty("RUN_MIGRATIONS"), true)?;

        let jwt_secret = non_empty("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                run_migrations,
            },
            auth: AuthConfig {
                jwt_secret,
                issuer: non_empty("JWT_ISSUER"),
                audience: non_empty("JWT_AUDIENCE"),
                required_scope: non_empty("AUTH_REQUIRED_SCOPE"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            max_connections: self.database.max_connections,
            ..pool::DatabaseConfig::with_url(self.database.url.clone())
        }
    }

    /// What incoming bearer tokens must satisfy
    pub fn token_validation(&self) -> TokenValidation {
        TokenValidation {
            issuer: self.auth.issuer.clone(),
            audience: self.auth.audience.clone(),
            ..TokenValidation::new(self.auth.jwt_secret.clone())
        }
    }

    /// Policy guarding the claims endpoints
    pub fn authorization_policy(&self) -> AuthorizationPolicy {
        let policy = AuthorizationPolicy::new(DEFAULT_POLICY_NAME);
        match &self.auth.required_scope {
            Some(scope) => policy.require_scope(scope.clone()),
            None => policy,
        }
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false, got {:?}", key, v),
        },
    }
}
