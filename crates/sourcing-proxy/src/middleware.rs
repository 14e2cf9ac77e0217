use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Shared key callers must present in `x-proxy-key`.
#[derive(Clone)]
pub struct ProxyAuthState {
    key: Arc<String>,
    pub enabled: bool,
}

impl std::fmt::Debug for ProxyAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAuthState")
            .field("key", &"[redacted]")
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl ProxyAuthState {
    /// Builds the key check from `COUPANG_PROXY_KEY`.
    ///
    /// In development a missing or blank key disables the check. In other
    /// environments it fails startup.
    pub fn new(key: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let key = key.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            if is_development {
                tracing::warn!(
                    "COUPANG_PROXY_KEY not set; proxy key check disabled in development"
                );
                return Ok(Self {
                    key: Arc::new(String::new()),
                    enabled: false,
                });
            }
            anyhow::bail!("COUPANG_PROXY_KEY is required outside development");
        }
        Ok(Self {
            key: Arc::new(key.to_owned()),
            enabled: true,
        })
    }

    fn allows(&self, presented: &str) -> bool {
        presented.as_bytes().ct_eq(self.key.as_bytes()).into()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn new(error: &'static str) -> Self {
        Self {
            error,
            message: None,
        }
    }

    pub(crate) fn with_message(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: Some(message.into()),
        }
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// An incoming `x-request-id` is reused; otherwise a `UUIDv4` is generated.
/// The ID is stored as a [`RequestId`] extension and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects requests whose `x-proxy-key` does not match.
pub async fn require_proxy_key(
    State(auth): State<ProxyAuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get(sourcing_gateway::PROXY_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if auth.allows(key) => next.run(req).await,
        _ => {
            tracing::warn!("rejected request with missing or invalid proxy key");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("INVALID_PROXY_KEY")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_refused_outside_development() {
        assert!(ProxyAuthState::new(Some("   "), false).is_err());
        assert!(ProxyAuthState::new(None, false).is_err());
    }

    #[test]
    fn missing_key_disables_check_in_development() {
        let auth = ProxyAuthState::new(None, true).unwrap();
        assert!(!auth.enabled);
        assert!(ProxyAuthState::new(Some("k"), true).unwrap().enabled);
    }

    #[test]
    fn key_comparison_is_exact() {
        let auth = ProxyAuthState::new(Some("secret-key"), false).unwrap();
        assert!(auth.allows("secret-key"));
        assert!(!auth.allows("secret-ke"));
        assert!(!auth.allows("secret-key2"));
        assert!(!auth.allows(""));
    }

    #[test]
    fn debug_output_redacts_key() {
        let auth = ProxyAuthState::new(Some("secret-key"), false).unwrap();
        assert!(!format!("{auth:?}").contains("secret-key"));
    }
}
