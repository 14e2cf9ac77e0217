//! Client side of the credential-holding proxy.
//!
//! The proxy signs on the caller's behalf and relays the marketplace answer
//! with an `x-upstream-status` header. A response without that header came
//! from the proxy itself, not the marketplace, and is treated as a transport
//! failure.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::error::GatewayError;
use crate::types::{parse_body_or_empty, GatewayRequest, GatewayResponse};

pub const PROXY_KEY_HEADER: &str = "x-proxy-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const UPSTREAM_STATUS_HEADER: &str = "x-upstream-status";
/// Prefix under which the proxy mirrors marketplace paths.
pub const PROXY_ROUTE_PREFIX: &str = "/api/marketplace";

#[derive(Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
    proxy_key: String,
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("base_url", &self.base_url)
            .field("proxy_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl ProxyClient {
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GatewayError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, proxy_key: &str, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sourcing/0.1 (proxy-client)")
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| GatewayError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            proxy_key: proxy_key.to_owned(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forwards `request` for `user_id` through the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ProxyTransport`] when the proxy cannot be
    /// reached or answers without relaying a marketplace response.
    pub async fn forward(
        &self,
        user_id: &str,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = format!(
            "{}{PROXY_ROUTE_PREFIX}{}",
            self.base_url,
            request.path_and_query()
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(PROXY_KEY_HEADER, &self.proxy_key)
            .header(USER_ID_HEADER, user_id)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = request.payload() {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::ProxyTransport(e.to_string()))?;

        let proxy_status = resp.status().as_u16();
        let upstream_status = resp
            .headers()
            .get(UPSTREAM_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u16>().ok());

        let bytes = resp.bytes().await.ok();
        let body = parse_body_or_empty(bytes.as_deref());

        match upstream_status {
            Some(_) => Ok(GatewayResponse {
                status: proxy_status,
                body,
            }),
            None => Err(GatewayError::ProxyTransport(format!(
                "proxy answered {proxy_status} without relaying a marketplace response: {body}"
            ))),
        }
    }
}
