/// Client settings
///
/// Defaults target a local identity server with the seeded admin client.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;

pub const DEFAULT_AUTHORITY: &str = "https://localhost:44310";
pub const DEFAULT_CLIENT_ID: &str = "skoruba_identity_admin";
pub const DEFAULT_CLIENT_SECRET: &str = "secret";
pub const DEFAULT_SCOPE: &str = "roles";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the identity server
    pub authority: String,

    pub client_id: String,

    pub client_secret: String,

    /// Space-separated scopes to request; empty requests none
    pub scope: String,

    /// Skip TLS certificate checks (local development certificates)
    pub accept_invalid_certs: bool,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: DEFAULT_CLIENT_SECRET.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// HTTP client for both requests
    pub fn http_client(&self) -> ClientResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .user_agent(concat!("nong-identity-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Connection {
                url: self.authority.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.authority, "https://localhost:44310");
        assert_eq!(config.client_id, "skoruba_identity_admin");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.scope, "roles");
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_http_client_builds() {
        let config = ClientConfig {
            accept_invalid_certs: true,
            ..Default::default()
        };
        assert!(config.http_client().is_ok());
    }
}
