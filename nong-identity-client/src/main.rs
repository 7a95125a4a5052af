//! # Nong Identity Client
//!
//! Console check against a running identity server: discovery followed by a
//! client-credentials token request. Prints the raw documents on stdout and
//! exits non-zero on the first failure.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p nong-identity-client -- --authority https://localhost:44310 --accept-invalid-certs
//! ```

use clap::Parser;
use nong_identity_client::{config, config::ClientConfig, run_flow};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nong-identity-client")]
#[command(about = "Discover an identity server and request a client-credentials token")]
#[command(version)]
struct Cli {
    /// Identity server base URL
    #[arg(long, env = "IDENTITY_AUTHORITY", default_value = config::DEFAULT_AUTHORITY)]
    authority: String,

    /// OAuth client id
    #[arg(long, env = "IDENTITY_CLIENT_ID", default_value = config::DEFAULT_CLIENT_ID)]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "IDENTITY_CLIENT_SECRET", default_value = config::DEFAULT_CLIENT_SECRET, hide_env_values = true)]
    client_secret: String,

    /// Space-separated scopes to request
    #[arg(long, env = "IDENTITY_SCOPE", default_value = config::DEFAULT_SCOPE)]
    scope: String,

    /// Accept self-signed development certificates
    #[arg(long, env = "IDENTITY_ACCEPT_INVALID_CERTS")]
    accept_invalid_certs: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout carries only the documents
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nong_identity_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig {
        authority: cli.authority,
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        scope: cli.scope,
        accept_invalid_certs: cli.accept_invalid_certs,
        timeout: Duration::from_secs(cli.timeout),
    };

    let mut stdout = std::io::stdout();
    if let Err(e) = run_flow(&config, &mut stdout).await {
        println!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}
