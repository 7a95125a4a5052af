/// JWT bearer token validation
///
/// Tokens are HS256-signed with a shared secret. Validation checks the
/// signature, `exp` and `nbf`, plus the issuer and audience when they are
/// configured, and turns the whole payload into a [`Principal`].
///
/// # Security
///
/// - **Algorithm**: HS256 only; tokens signed with anything else are rejected
/// - **Clock skew**: `leeway_seconds` (default 60) applies to `exp` and `nbf`
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use nong_identity_shared::auth::jwt::{issue_token, validate_token, TokenValidation};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let validation = TokenValidation::new("your-secret-key-at-least-32-bytes!!")
///     .with_issuer("https://localhost:44310");
///
/// let token = issue_token(
///     &validation,
///     "user-42",
///     &[("scope", "roles".into())],
///     chrono::Duration::minutes(5),
/// )?;
///
/// let principal = validate_token(&token, &validation)?;
/// assert_eq!(principal.subject(), Some("user-42"));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Serialize;
use serde_json::{Map, Value};

use super::claims::{claims_from_payload, Principal};

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is not valid yet (`nbf` in the future)
    #[error("Token is not valid yet")]
    NotYetValid,

    /// Signature does not match the configured secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Invalid token format
    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Invalid audience
    #[error("Invalid audience: expected {expected}")]
    InvalidAudience { expected: String },
}

/// What a bearer token must satisfy
#[derive(Debug, Clone)]
pub struct TokenValidation {
    /// HS256 shared secret
    pub secret: String,

    /// Required `iss`, if any
    pub issuer: Option<String>,

    /// Required `aud`, if any
    pub audience: Option<String>,

    /// Allowed clock skew for `exp`/`nbf`
    pub leeway_seconds: u64,
}

impl TokenValidation {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
            leeway_seconds: 60,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn to_validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        validation
    }
}

/// Creates a JWT token from any serializable payload
///
/// Signs the token using HS256 with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a token that passes `validation`
///
/// Sets `sub`, `iat`, `nbf`, `exp` and, when configured, `iss` and `aud`.
/// `extra` members are added after those and may repeat a name to build an
/// array claim.
pub fn issue_token(
    validation: &TokenValidation,
    subject: &str,
    extra: &[(&str, Value)],
    ttl: Duration,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let mut payload = Map::new();

    payload.insert("sub".into(), Value::from(subject));
    payload.insert("iat".into(), Value::from(now.timestamp()));
    payload.insert("nbf".into(), Value::from(now.timestamp()));
    payload.insert("exp".into(), Value::from((now + ttl).timestamp()));

    if let Some(issuer) = &validation.issuer {
        payload.insert("iss".into(), Value::from(issuer.as_str()));
    }
    if let Some(audience) = &validation.audience {
        payload.insert("aud".into(), Value::from(audience.as_str()));
    }

    for (name, value) in extra {
        match payload.get_mut(*name) {
            Some(Value::Array(items)) => items.push(value.clone()),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value.clone()]);
            }
            None => {
                payload.insert((*name).to_string(), value.clone());
            }
        }
    }

    create_token(&payload, &validation.secret)
}

/// Validates a JWT token and returns the caller's claims
///
/// Verifies:
/// - Signature is valid for the configured secret
/// - Token hasn't expired and is already valid (`nbf`)
/// - Issuer and audience match, when configured
///
/// # Errors
///
/// Returns a `JwtError` naming the first check that failed
pub fn validate_token(token: &str, validation: &TokenValidation) -> Result<Principal, JwtError> {
    let key = DecodingKey::from_secret(validation.secret.as_bytes());

    let token_data = decode::<Map<String, Value>>(token, &key, &validation.to_validation())
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: validation.issuer.clone().unwrap_or_default(),
            },
            ErrorKind::InvalidAudience => JwtError::InvalidAudience {
                expected: validation.audience.clone().unwrap_or_default(),
            },
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                JwtError::InvalidFormat(e.to_string())
            }
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        })?;

    Ok(Principal::new(claims_from_payload(&token_data.claims)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_and_validate() {
        let validation = TokenValidation::new(SECRET);
        let token = issue_token(
            &validation,
            "user-1",
            &[("a", json!("1")), ("b", json!("2"))],
            Duration::minutes(5),
        )
        .expect("Token creation should succeed");

        let principal = validate_token(&token, &validation).expect("Validation should succeed");
        assert_eq!(principal.subject(), Some("user-1"));
        assert!(principal.has_claim("a", "1"));
        assert!(principal.has_claim("b", "2"));
        assert!(principal.find_first("exp").is_some());
    }

    #[test]
    fn test_repeated_extra_becomes_array() {
        let validation = TokenValidation::new(SECRET);
        let token = issue_token(
            &validation,
            "user-1",
            &[("scope", json!("roles")), ("scope", json!("api"))],
            Duration::minutes(5),
        )
        .unwrap();

        let principal = validate_token(&token, &validation).unwrap();
        let scopes: Vec<&str> = principal.find_all("scope").map(|c| c.value.as_str()).collect();
        assert_eq!(scopes, vec!["roles", "api"]);
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_token(
            &TokenValidation::new(SECRET),
            "user-1",
            &[],
            Duration::minutes(5),
        )
        .unwrap();

        let result = validate_token(&token, &TokenValidation::new("a-completely-different-secret-value"));
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let validation = TokenValidation::new(SECRET);
        let past = Utc::now() - Duration::hours(2);
        let token = create_token(
            &json!({ "sub": "user-1", "iat": past.timestamp(), "exp": (past + Duration::minutes(5)).timestamp() }),
            SECRET,
        )
        .unwrap();

        let result = validate_token(&token, &validation);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_not_yet_valid() {
        let validation = TokenValidation::new(SECRET);
        let future = Utc::now() + Duration::hours(1);
        let token = create_token(
            &json!({ "sub": "user-1", "nbf": future.timestamp(), "exp": (future + Duration::hours(1)).timestamp() }),
            SECRET,
        )
        .unwrap();

        let result = validate_token(&token, &validation);
        assert!(matches!(result, Err(JwtError::NotYetValid)));
    }

    #[test]
    fn test_missing_exp_rejected() {
        let token = create_token(&json!({ "sub": "user-1" }), SECRET).unwrap();
        assert!(validate_token(&token, &TokenValidation::new(SECRET)).is_err());
    }

    #[test]
    fn test_issuer_checked_when_configured() {
        let issuing = TokenValidation::new(SECRET).with_issuer("https://other.example");
        let token = issue_token(&issuing, "user-1", &[], Duration::minutes(5)).unwrap();

        let expecting = TokenValidation::new(SECRET).with_issuer("https://localhost:44310");
        let result = validate_token(&token, &expecting);
        assert!(matches!(result, Err(JwtError::InvalidIssuer { .. })));

        // No issuer configured: any issuer is accepted
        assert!(validate_token(&token, &TokenValidation::new(SECRET)).is_ok());
    }

    #[test]
    fn test_audience_checked_when_configured() {
        let issuing = TokenValidation::new(SECRET).with_audience("other_api");
        let token = issue_token(&issuing, "user-1", &[], Duration::minutes(5)).unwrap();

        let expecting = TokenValidation::new(SECRET).with_audience("identity_admin_api");
        let result = validate_token(&token, &expecting);
        assert!(matches!(result, Err(JwtError::InvalidAudience { .. })));

        // Tokens carrying an audience pass when none is required
        assert!(validate_token(&token, &TokenValidation::new(SECRET)).is_ok());
    }

    #[test]
    fn test_garbage_token() {
        let result = validate_token("not.a.jwt", &TokenValidation::new(SECRET));
        assert!(result.is_err());
    }
}
