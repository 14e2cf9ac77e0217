use thiserror::Error;

/// Errors returned by the marketplace gateway.
///
/// A marketplace-level failure (any HTTP status the marketplace answers with)
/// is not an error here: it comes back as a
/// [`GatewayResponse`](crate::GatewayResponse) carrying the status and body.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or TLS failure talking to the marketplace directly.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("no active marketplace credentials for user '{user_id}'")]
    NoCredentials { user_id: String },

    /// More than one active credential; refusing to pick one.
    #[error("user '{user_id}' has {count} active marketplace credentials")]
    AmbiguousCredentials { user_id: String, count: usize },

    #[error("failed to read credentials {path}: {source}")]
    CredentialsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials {path}: {source}")]
    CredentialsParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The proxy itself could not be reached or answered without relaying a
    /// marketplace response.
    #[error("proxy transport failure: {0}")]
    ProxyTransport(String),
}

impl GatewayError {
    /// Whether direct mode failed because no usable credential exists.
    #[must_use]
    pub fn is_credential_resolution(&self) -> bool {
        matches!(
            self,
            GatewayError::NoCredentials { .. }
                | GatewayError::AmbiguousCredentials { .. }
                | GatewayError::CredentialsIo { .. }
                | GatewayError::CredentialsParse { .. }
        )
    }
}
