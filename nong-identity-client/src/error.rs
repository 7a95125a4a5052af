/// Errors raised by the discovery and token steps
///
/// Every variant renders as the one-line message the console prints before
/// giving up.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Authority is not an absolute URL
    #[error("Malformed authority: {0}")]
    InvalidAuthority(String),

    /// Plain HTTP to a non-loopback host
    #[error("HTTPS required: {0}")]
    HttpsRequired(String),

    /// Transport failure (DNS, TLS, connection refused, timeout)
    #[error("Error connecting to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Discovery endpoint answered with a non-success status
    #[error("Error connecting to {url}: {status}")]
    DiscoveryStatus { url: String, status: u16 },

    /// Response body is not a JSON object
    #[error("Invalid JSON from {url}: {reason}")]
    InvalidJson { url: String, reason: String },

    #[error("Issuer name does not match authority: {actual}")]
    IssuerMismatch { expected: String, actual: String },

    /// An advertised endpoint points outside the authority
    #[error("Endpoint belongs to different authority: {name} ({url})")]
    EndpointOutsideAuthority { name: String, url: String },

    #[error("Discovery document has no token_endpoint")]
    MissingTokenEndpoint,

    /// Token endpoint rejected the request; carries the `error` member or
    /// the HTTP status
    #[error("{0}")]
    TokenRequest(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
