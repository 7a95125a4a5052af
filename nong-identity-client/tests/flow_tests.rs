/// End-to-end tests for the discovery + token flow
///
/// A loopback axum server stands in for the identity server; plain HTTP is
/// accepted because the host is 127.0.0.1.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use nong_identity_client::config::ClientConfig;
use nong_identity_client::error::ClientError;
use nong_identity_client::{run_flow, GREETING};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
struct TokenForm {
    grant_type: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

#[derive(Clone)]
struct Fixture {
    discovery: Arc<Value>,
    received: Arc<Mutex<Vec<TokenForm>>>,
}

async fn discovery(State(fixture): State<Fixture>) -> Json<Value> {
    Json((*fixture.discovery).clone())
}

async fn token(State(fixture): State<Fixture>, Form(form): Form<TokenForm>) -> impl IntoResponse {
    fixture.received.lock().unwrap().push(form.clone());

    if form.grant_type != "client_credentials" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        );
    }
    if form.client_id != "skoruba_identity_admin" || form.client_secret != "secret" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_client" })),
        );
    }
    if form.scope.as_deref() != Some("roles") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_scope" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "access_token": "eyJhbGciOiJSUzI1NiJ9.test.sig",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": "roles"
        })),
    )
}

/// Starts the fixture; `document` builds the discovery JSON from the base URL
async fn spawn_server(
    document: impl FnOnce(&str) -> Value,
) -> (String, Arc<Mutex<Vec<TokenForm>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let fixture = Fixture {
        discovery: Arc::new(document(&base)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let received = fixture.received.clone();

    let app = Router::new()
        .route("/.well-known/openid-configuration", get(discovery))
        .route("/connect/token", post(token))
        .with_state(fixture);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base, received)
}

fn standard_document(base: &str) -> Value {
    json!({
        "issuer": base,
        "jwks_uri": format!("{}/.well-known/openid-configuration/jwks", base),
        "token_endpoint": format!("{}/connect/token", base),
        "grant_types_supported": ["client_credentials"],
        "scopes_supported": ["roles"]
    })
}

fn config(authority: &str) -> ClientConfig {
    ClientConfig {
        authority: authority.to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn lines(out: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(out)
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_flow_prints_greeting_discovery_and_token() {
    let (base, received) = spawn_server(standard_document).await;
    let mut out = Vec::new();

    let outcome = run_flow(&config(&base), &mut out).await.unwrap();

    let printed = lines(&out);
    assert_eq!(printed.len(), 3);
    assert_eq!(printed[0], GREETING);

    let printed_discovery: Value = serde_json::from_str(&printed[1]).unwrap();
    assert_eq!(printed_discovery, standard_document(&base));

    let printed_token: Value = serde_json::from_str(&printed[2]).unwrap();
    assert_eq!(printed_token["token_type"], "Bearer");
    assert_eq!(outcome.token.expires_in(), Some(3600));

    let forms = received.lock().unwrap();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].grant_type, "client_credentials");
    assert_eq!(forms[0].client_id, "skoruba_identity_admin");
    assert_eq!(forms[0].client_secret, "secret");
    assert_eq!(forms[0].scope.as_deref(), Some("roles"));
}

#[tokio::test]
async fn test_authority_with_trailing_slash() {
    let (base, _) = spawn_server(standard_document).await;
    let mut out = Vec::new();

    let outcome = run_flow(&config(&format!("{}/", base)), &mut out).await.unwrap();

    assert_eq!(outcome.discovery.authority, base);
}

#[tokio::test]
async fn test_token_error_stops_after_discovery() {
    let (base, _) = spawn_server(standard_document).await;
    let mut out = Vec::new();
    let config = ClientConfig {
        client_secret: "wrong".to_string(),
        ..config(&base)
    };

    let err = run_flow(&config, &mut out).await.unwrap_err();

    assert!(matches!(err, ClientError::TokenRequest(ref e) if e == "invalid_client"));
    // Greeting and discovery document only
    assert_eq!(lines(&out).len(), 2);
}

#[tokio::test]
async fn test_html_token_response_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let document = standard_document(&base);

    // A login page served with 200 instead of a token
    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(move || async move { Json(document) }),
        )
        .route(
            "/connect/token",
            post(|| async { Html("<html>login</html>") }),
        );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let mut out = Vec::new();

    let err = run_flow(&config(&base), &mut out).await.unwrap_err();

    assert!(
        matches!(err, ClientError::TokenRequest(ref e) if e == "Invalid JSON in token response")
    );
    assert_eq!(lines(&out).len(), 2);
}

#[tokio::test]
async fn test_issuer_mismatch_stops_before_token_request() {
    let (base, received) = spawn_server(|base| {
        let mut doc = standard_document(base);
        doc["issuer"] = json!("https://someone-else.example");
        doc
    })
    .await;
    let mut out = Vec::new();

    let err = run_flow(&config(&base), &mut out).await.unwrap_err();

    assert!(matches!(err, ClientError::IssuerMismatch { .. }));
    assert_eq!(lines(&out), vec![GREETING.to_string()]);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_foreign_token_endpoint_is_rejected() {
    let (base, received) = spawn_server(|base| {
        let mut doc = standard_document(base);
        doc["token_endpoint"] = json!("http://127.0.0.2:9/connect/token");
        doc
    })
    .await;
    let mut out = Vec::new();

    let err = run_flow(&config(&base), &mut out).await.unwrap_err();

    assert!(matches!(err, ClientError::EndpointOutsideAuthority { .. }));
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_discovery_document() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, Router::new()).await.unwrap();
    });
    let mut out = Vec::new();

    let err = run_flow(&config(&base), &mut out).await.unwrap_err();

    assert!(matches!(err, ClientError::DiscoveryStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let mut out = Vec::new();

    let err = run_flow(&config(&base), &mut out).await.unwrap_err();

    assert!(matches!(err, ClientError::Connection { .. }));
    assert!(err.to_string().starts_with("Error connecting to"));
}

#[tokio::test]
async fn test_plain_http_to_remote_host_is_refused() {
    let mut out = Vec::new();

    let err = run_flow(&config("http://identity.example.com"), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::HttpsRequired(_)));
}
