/// Client-credentials token request
///
/// Credentials travel in the form body alongside `grant_type` and `scope`.
/// A response is an error when the status is not 2xx, the body is not JSON,
/// or the JSON body carries an `error` member.

use crate::error::{ClientError, ClientResult};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

pub const GRANT_TYPE: &str = "client_credentials";

#[derive(Debug, Clone)]
pub struct ClientCredentialsRequest {
    /// Token endpoint URL
    pub address: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

#[derive(Serialize)]
struct TokenForm<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

impl ClientCredentialsRequest {
    fn form(&self) -> TokenForm<'_> {
        TokenForm {
            grant_type: GRANT_TYPE,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scope: self.scope.as_deref().filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Token endpoint reply
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub status: u16,

    /// Response body exactly as received
    pub raw: String,

    /// Parsed body, when it was JSON
    pub json: Option<Value>,
}

impl TokenResponse {
    fn member(&self, name: &str) -> Option<&Value> {
        self.json.as_ref().and_then(|j| j.get(name))
    }

    pub fn is_error(&self) -> bool {
        !(200..300).contains(&self.status) || self.json.is_none() || self.member("error").is_some()
    }

    /// The protocol error, else the HTTP status, else the unparsable body
    pub fn error(&self) -> Option<String> {
        if let Some(error) = self.member("error") {
            let error = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Some(match self.error_description() {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            });
        }

        if !(200..300).contains(&self.status) {
            return Some(format!("HTTP {}", self.status));
        }

        if self.json.is_none() {
            return Some("Invalid JSON in token response".to_string());
        }

        None
    }

    pub fn error_description(&self) -> Option<&str> {
        self.member("error_description").and_then(Value::as_str)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.member("access_token").and_then(Value::as_str)
    }

    pub fn token_type(&self) -> Option<&str> {
        self.member("token_type").and_then(Value::as_str)
    }

    pub fn expires_in(&self) -> Option<i64> {
        self.member("expires_in").and_then(Value::as_i64)
    }
}

/// Sends the request and fails on any error response
pub async fn request_token(
    http: &reqwest::Client,
    request: &ClientCredentialsRequest,
) -> ClientResult<TokenResponse> {
    info!(
        address = %request.address,
        client_id = %request.client_id,
        scope = request.scope.as_deref().unwrap_or_default(),
        "Requesting client credentials token"
    );

    let response = http
        .post(&request.address)
        .form(&request.form())
        .send()
        .await
        .map_err(|source| ClientError::Connection {
            url: request.address.clone(),
            source,
        })?;

    let status = response.status().as_u16();
    let raw = response
        .text()
        .await
        .map_err(|source| ClientError::Connection {
            url: request.address.clone(),
            source,
        })?;

    let token = TokenResponse {
        status,
        json: serde_json::from_str(&raw).ok(),
        raw,
    };

    if let Some(error) = token.error() {
        debug!(status, error = %error, "Token request rejected");
        return Err(ClientError::TokenRequest(error));
    }

    debug!(
        token_type = token.token_type().unwrap_or_default(),
        expires_in = token.expires_in().unwrap_or_default(),
        "Token issued"
    );
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> TokenResponse {
        TokenResponse {
            status,
            raw: body.to_string(),
            json: Some(body),
        }
    }

    #[test]
    fn test_success() {
        let token = response(
            200,
            json!({ "access_token": "abc", "token_type": "Bearer", "expires_in": 3600 }),
        );
        assert!(!token.is_error());
        assert!(token.error().is_none());
        assert_eq!(token.access_token(), Some("abc"));
        assert_eq!(token.expires_in(), Some(3600));
    }

    #[test]
    fn test_error_member_on_success_status() {
        let token = response(200, json!({ "error": "invalid_scope" }));
        assert!(token.is_error());
        assert_eq!(token.error().as_deref(), Some("invalid_scope"));
    }

    #[test]
    fn test_error_with_description() {
        let token = response(
            400,
            json!({ "error": "invalid_client", "error_description": "unknown client" }),
        );
        assert_eq!(token.error().as_deref(), Some("invalid_client: unknown client"));
    }

    #[test]
    fn test_status_without_error_member() {
        let token = TokenResponse {
            status: 500,
            raw: "oops".to_string(),
            json: None,
        };
        assert_eq!(token.error().as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_non_json_success_is_error() {
        let token = TokenResponse {
            status: 200,
            raw: "<html>login</html>".to_string(),
            json: None,
        };
        assert!(token.is_error());
        assert_eq!(token.error().as_deref(), Some("Invalid JSON in token response"));
        assert!(token.access_token().is_none());
    }

    #[test]
    fn test_form_fields() {
        let request = ClientCredentialsRequest {
            address: "https://localhost:44310/connect/token".to_string(),
            client_id: "skoruba_identity_admin".to_string(),
            client_secret: "secret".to_string(),
            scope: Some("roles".to_string()),
        };
        let form = serde_json::to_value(request.form()).unwrap();
        assert_eq!(
            form,
            json!({
                "grant_type": "client_credentials",
                "client_id": "skoruba_identity_admin",
                "client_secret": "secret",
                "scope": "roles"
            })
        );

        let no_scope = ClientCredentialsRequest {
            scope: Some(" ".to_string()),
            ..request
        };
        assert!(serde_json::to_value(no_scope.form()).unwrap().get("scope").is_none());
    }
}
