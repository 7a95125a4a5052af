//! # Nong Identity Client Library
//!
//! Exercises a running identity server: discovers its endpoints, then asks
//! the token endpoint for a client-credentials token.
//!
//! ## Modules
//!
//! - `config`: Authority, client credentials and HTTP settings
//! - `discovery`: Discovery document fetch and validation
//! - `token`: Client-credentials token request
//! - `error`: Client error type
//!
//! ## Example
//!
//! ```no_run
//! use nong_identity_client::{config::ClientConfig, run_flow};
//!
//! # async fn example() -> Result<(), nong_identity_client::error::ClientError> {
//! let mut out = std::io::stdout();
//! let outcome = run_flow(&ClientConfig::default(), &mut out).await?;
//! println!("{:?}", outcome.token.access_token());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod token;

use config::ClientConfig;
use discovery::{fetch_discovery, DiscoveryDocument, DiscoveryPolicy};
use error::ClientResult;
use std::io::Write;
use token::{request_token, ClientCredentialsRequest, TokenResponse};

pub const GREETING: &str = "Hello, World!";

/// What a successful run fetched
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub discovery: DiscoveryDocument,
    pub token: TokenResponse,
}

/// Greets, prints the raw discovery document, then the raw token response
///
/// Stops at the first failure without retrying; the caller prints the error.
pub async fn run_flow(config: &ClientConfig, out: &mut impl Write) -> ClientResult<FlowOutcome> {
    writeln!(out, "{}", GREETING)?;

    let http = config.http_client()?;

    let discovery = fetch_discovery(&http, &config.authority, &DiscoveryPolicy::default()).await?;
    writeln!(out, "{}", discovery.raw)?;

    let request = ClientCredentialsRequest {
        address: discovery.token_endpoint()?.to_string(),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        scope: Some(config.scope.clone()),
    };

    let token = request_token(&http, &request).await?;
    writeln!(out, "{}", token.raw)?;

    Ok(FlowOutcome { discovery, token })
}
