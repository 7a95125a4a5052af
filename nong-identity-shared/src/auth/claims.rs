/// Claims and the authenticated principal
///
/// A validated token becomes a [`Principal`]: the ordered list of
/// (`type`, `value`) pairs found in its payload. Arrays in the payload yield
/// one claim per element; numbers, booleans and objects are carried as their
/// JSON text.
///
/// # Example
///
/// ```
/// use nong_identity_shared::auth::claims::{claims_from_payload, Claim, Principal};
/// use serde_json::json;
///
/// let payload = json!({ "sub": "42", "scope": ["roles", "api"], "admin": true });
/// let principal = Principal::new(claims_from_payload(payload.as_object().unwrap()));
///
/// assert_eq!(principal.find_first("sub"), Some("42"));
/// assert!(principal.has_claim("scope", "api"));
/// assert!(principal.has_claim("admin", "true"));
/// ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single (`type`, `value`) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Authenticated caller
///
/// Claim order is preserved as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    claims: Vec<Claim>,
}

impl Principal {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// All claims in order
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn into_claims(self) -> Vec<Claim> {
        self.claims
    }

    /// Value of the first claim of the given type
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Every claim of the given type
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims.iter().filter(move |c| c.claim_type == claim_type)
    }

    /// Whether any claim matches both type and value exactly
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims
            .iter()
            .any(|c| c.claim_type == claim_type && c.value == value)
    }

    /// Subject identifier (`sub`)
    pub fn subject(&self) -> Option<&str> {
        self.find_first("sub")
    }
}

/// Flattens a token payload into claims
///
/// Members are visited in map order. `null` members and `null` array
/// elements produce no claim.
pub fn claims_from_payload(payload: &Map<String, Value>) -> Vec<Claim> {
    let mut claims = Vec::with_capacity(payload.len());

    for (claim_type, value) in payload {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = claim_value(item) {
                        claims.push(Claim::new(claim_type.as_str(), text));
                    }
                }
            }
            other => {
                if let Some(text) = claim_value(other) {
                    claims.push(Claim::new(claim_type.as_str(), text));
                }
            }
        }
    }

    claims
}

fn claim_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
