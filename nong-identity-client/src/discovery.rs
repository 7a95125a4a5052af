/// OpenID Connect discovery
///
/// Fetches `{authority}/.well-known/openid-configuration` and checks it
/// against a [`DiscoveryPolicy`] before any endpoint in it is used.
///
/// # Example
///
/// ```no_run
/// use nong_identity_client::discovery::{fetch_discovery, DiscoveryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let http = reqwest::Client::new();
/// let disco = fetch_discovery(&http, "https://localhost:44310", &DiscoveryPolicy::default()).await?;
/// println!("token endpoint: {}", disco.token_endpoint()?);
/// # Ok(())
/// # }
/// ```

use crate::error::{ClientError, ClientResult};
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::{Host, Url};

pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// Checks applied to the discovery document
#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
    /// Authority and endpoints must use HTTPS
    pub require_https: bool,

    /// Plain HTTP is fine for localhost, 127.0.0.0/8 and ::1
    pub allow_http_on_loopback: bool,

    /// `issuer` must equal the authority
    pub validate_issuer_name: bool,

    /// Every advertised endpoint must live under the authority
    pub validate_endpoints: bool,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            require_https: true,
            allow_http_on_loopback: true,
            validate_issuer_name: true,
            validate_endpoints: true,
        }
    }
}

/// A fetched discovery document
#[derive(Debug, Clone)]
pub struct DiscoveryDocument {
    /// Authority the document was fetched for, without trailing slash
    pub authority: String,

    /// Response body exactly as received
    pub raw: String,

    pub json: Map<String, Value>,
}

impl DiscoveryDocument {
    /// Parses a document body fetched from `url`
    pub fn parse(authority: &str, url: &str, raw: String) -> ClientResult<Self> {
        let json = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(ClientError::InvalidJson {
                    url: url.to_string(),
                    reason: "expected a JSON object".to_string(),
                })
            }
            Err(e) => {
                return Err(ClientError::InvalidJson {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self {
            authority: authority.to_string(),
            raw,
            json,
        })
    }

    fn string(&self, name: &str) -> Option<&str> {
        self.json.get(name).and_then(Value::as_str)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.string("issuer")
    }

    pub fn token_endpoint(&self) -> ClientResult<&str> {
        self.string("token_endpoint")
            .filter(|e| !e.is_empty())
            .ok_or(ClientError::MissingTokenEndpoint)
    }

    /// `*_endpoint` members and `jwks_uri`, in document order
    pub fn endpoints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.json.iter().filter_map(|(name, value)| {
            let is_endpoint = name.ends_with("_endpoint") || name == "jwks_uri";
            match value {
                Value::String(url) if is_endpoint => Some((name.as_str(), url.as_str())),
                _ => None,
            }
        })
    }

    /// Applies `policy` to the document
    pub fn validate(&self, policy: &DiscoveryPolicy) -> ClientResult<()> {
        if policy.validate_issuer_name {
            let issuer = self.issuer().unwrap_or_default();
            // Host names and schemes compare without regard to case
            if !issuer
                .trim_end_matches('/')
                .eq_ignore_ascii_case(&self.authority)
            {
                return Err(ClientError::IssuerMismatch {
                    expected: self.authority.clone(),
                    actual: issuer.to_string(),
                });
            }
        }

        if policy.validate_endpoints {
            for (name, url) in self.endpoints() {
                let parsed = Url::parse(url).map_err(|_| ClientError::EndpointOutsideAuthority {
                    name: name.to_string(),
                    url: url.to_string(),
                })?;
                check_scheme(&parsed, policy)?;

                if !starts_with_ignore_case(url, &self.authority) {
                    return Err(ClientError::EndpointOutsideAuthority {
                        name: name.to_string(),
                        url: url.to_string(),
                    });
                }
            }
        }

        self.token_endpoint()?;
        Ok(())
    }
}

/// Splits user input into the authority and the discovery URL
///
/// Accepts either the authority itself or the full discovery URL.
pub fn resolve(input: &str, policy: &DiscoveryPolicy) -> ClientResult<(String, String)> {
    let trimmed = input.trim().trim_end_matches('/');
    let authority = trimmed
        .strip_suffix(WELL_KNOWN_PATH)
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string();

    let parsed =
        Url::parse(&authority).map_err(|e| ClientError::InvalidAuthority(format!("{}: {}", input, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
        return Err(ClientError::InvalidAuthority(input.to_string()));
    }
    check_scheme(&parsed, policy)?;

    let discovery_url = format!("{}{}", authority, WELL_KNOWN_PATH);
    Ok((authority, discovery_url))
}

/// Fetches and validates the discovery document for `authority`
pub async fn fetch_discovery(
    http: &reqwest::Client,
    authority: &str,
    policy: &DiscoveryPolicy,
) -> ClientResult<DiscoveryDocument> {
    let (authority, url) = resolve(authority, policy)?;
    info!(url = %url, "Fetching discovery document");

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|source| ClientError::Connection {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::DiscoveryStatus {
            url,
            status: status.as_u16(),
        });
    }

    let raw = response
        .text()
        .await
        .map_err(|source| ClientError::Connection {
            url: url.clone(),
            source,
        })?;

    let document = DiscoveryDocument::parse(&authority, &url, raw)?;
    document.validate(policy)?;

    debug!(
        issuer = document.issuer().unwrap_or_default(),
        endpoints = document.endpoints().count(),
        "Discovery document accepted"
    );
    Ok(document)
}

pub fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn check_scheme(url: &Url, policy: &DiscoveryPolicy) -> ClientResult<()> {
    if !policy.require_https || url.scheme() == "https" {
        return Ok(());
    }
    if policy.allow_http_on_loopback && is_loopback(url) {
        return Ok(());
    }
    Err(ClientError::HttpsRequired(url.to_string()))
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AUTHORITY: &str = "https://localhost:44310";

    fn document(body: Value) -> DiscoveryDocument {
        DiscoveryDocument::parse(AUTHORITY, "test", body.to_string()).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "issuer": "https://localhost:44310",
            "jwks_uri": "https://localhost:44310/.well-known/openid-configuration/jwks",
            "authorization_endpoint": "https://localhost:44310/connect/authorize",
            "token_endpoint": "https://localhost:44310/connect/token",
            "scopes_supported": ["openid", "roles"]
        })
    }

    #[test]
    fn test_resolve_variants() {
        let policy = DiscoveryPolicy::default();
        let expected = (
            AUTHORITY.to_string(),
            "https://localhost:44310/.well-known/openid-configuration".to_string(),
        );

        assert_eq!(resolve(AUTHORITY, &policy).unwrap(), expected);
        assert_eq!(resolve("https://localhost:44310/", &policy).unwrap(), expected);
        assert_eq!(
            resolve(
                "https://localhost:44310/.well-known/openid-configuration",
                &policy
            )
            .unwrap(),
            expected
        );
    }

    #[test]
    fn test_https_required_except_loopback() {
        let policy = DiscoveryPolicy::default();

        assert!(matches!(
            resolve("http://identity.example.com", &policy),
            Err(ClientError::HttpsRequired(_))
        ));
        assert!(resolve("http://localhost:5000", &policy).is_ok());
        assert!(resolve("http://127.0.0.1:5000", &policy).is_ok());
        assert!(resolve("http://[::1]:5000", &policy).is_ok());

        let strict = DiscoveryPolicy {
            allow_http_on_loopback: false,
            ..Default::default()
        };
        assert!(resolve("http://localhost:5000", &strict).is_err());
    }

    #[test]
    fn test_malformed_authority() {
        let policy = DiscoveryPolicy::default();
        assert!(matches!(
            resolve("not a url", &policy),
            Err(ClientError::InvalidAuthority(_))
        ));
        assert!(matches!(
            resolve("ftp://localhost", &policy),
            Err(ClientError::InvalidAuthority(_))
        ));
    }

    #[test]
    fn test_valid_document() {
        let doc = document(valid_body());
        doc.validate(&DiscoveryPolicy::default()).unwrap();
        assert_eq!(doc.token_endpoint().unwrap(), "https://localhost:44310/connect/token");
        assert_eq!(doc.endpoints().count(), 3);
    }

    #[test]
    fn test_issuer_trailing_slash_ignored() {
        let mut body = valid_body();
        body["issuer"] = json!("https://localhost:44310/");
        assert!(document(body).validate(&DiscoveryPolicy::default()).is_ok());
    }

    #[test]
    fn test_issuer_case_ignored() {
        let mut body = valid_body();
        body["issuer"] = json!("HTTPS://LocalHost:44310/");
        assert!(document(body).validate(&DiscoveryPolicy::default()).is_ok());
    }

    #[test]
    fn test_issuer_mismatch() {
        let mut body = valid_body();
        body["issuer"] = json!("https://other:44310");
        assert!(matches!(
            document(body).validate(&DiscoveryPolicy::default()),
            Err(ClientError::IssuerMismatch { .. })
        ));
    }

    #[test]
    fn test_endpoint_outside_authority() {
        let mut body = valid_body();
        body["token_endpoint"] = json!("https://evil.example/connect/token");
        assert!(matches!(
            document(body.clone()).validate(&DiscoveryPolicy::default()),
            Err(ClientError::EndpointOutsideAuthority { .. })
        ));

        let relaxed = DiscoveryPolicy {
            validate_endpoints: false,
            ..Default::default()
        };
        assert!(document(body).validate(&relaxed).is_ok());
    }

    #[test]
    fn test_missing_token_endpoint() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("token_endpoint");
        assert!(matches!(
            document(body).validate(&DiscoveryPolicy::default()),
            Err(ClientError::MissingTokenEndpoint)
        ));
    }

    #[test]
    fn test_non_object_body() {
        assert!(matches!(
            DiscoveryDocument::parse(AUTHORITY, "test", "[1, 2]".to_string()),
            Err(ClientError::InvalidJson { .. })
        ));
        assert!(matches!(
            DiscoveryDocument::parse(AUTHORITY, "test", "<html>".to_string()),
            Err(ClientError::InvalidJson { .. })
        ));
    }
}
