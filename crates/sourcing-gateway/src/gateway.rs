//! Routing of marketplace calls through the proxy or directly.
//!
//! With a proxy configured every call goes through it. If the proxy cannot
//! be reached the call is retried in direct mode. When direct mode has no
//! usable credential either, the proxy's error is what the caller sees.

use std::sync::Arc;

use reqwest::Method;
use sourcing_core::AppConfig;

use crate::client::GatewayClient;
use crate::credentials::{resolve_active, CredentialSource};
use crate::error::GatewayError;
use crate::proxy::ProxyClient;
use crate::types::{GatewayRequest, GatewayResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Indirect,
    Direct,
}

impl std::fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayMode::Indirect => write!(f, "indirect"),
            GatewayMode::Direct => write!(f, "direct"),
        }
    }
}

/// Marketplace path that sets a vendor item's sale price.
#[must_use]
pub fn price_update_path(vendor_item_id: &str, price: i64) -> String {
    format!(
        "/v2/providers/seller_api/apis/api/v1/marketplace/vendor-items/{vendor_item_id}/prices/{price}"
    )
}

pub struct MarketplaceGateway {
    direct: GatewayClient,
    proxy: Option<ProxyClient>,
    credentials: Arc<dyn CredentialSource>,
}

impl MarketplaceGateway {
    #[must_use]
    pub fn new(
        direct: GatewayClient,
        proxy: Option<ProxyClient>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            direct,
            proxy,
            credentials,
        }
    }

    /// Builds the gateway from configuration. A proxy is used when
    /// `COUPANG_PROXY_URL` is set.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if either HTTP client cannot be constructed.
    pub fn from_config(
        config: &AppConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, GatewayError> {
        let direct =
            GatewayClient::with_base_url(&config.marketplace_base_url, config.gateway_timeout_secs)?
                .with_rate_limit_retries(
                    config.gateway_max_429_retries,
                    config.gateway_backoff_base_ms,
                );

        let proxy = match (&config.proxy_url, &config.proxy_key) {
            (Some(url), Some(key)) => {
                Some(ProxyClient::new(url, key, config.gateway_timeout_secs)?)
            }
            _ => None,
        };

        Ok(Self::new(direct, proxy, credentials))
    }

    #[must_use]
    pub fn mode(&self) -> GatewayMode {
        if self.proxy.is_some() {
            GatewayMode::Indirect
        } else {
            GatewayMode::Direct
        }
    }

    /// Performs `request` on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ProxyTransport`] if the proxy failed and direct mode
    ///   could not resolve a credential.
    /// - [`GatewayError::NoCredentials`] / [`GatewayError::AmbiguousCredentials`]
    ///   in direct mode.
    /// - [`GatewayError::Http`] on a direct-mode network failure.
    pub async fn call(
        &self,
        user_id: &str,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let Some(proxy) = &self.proxy else {
            return self.call_direct(user_id, request).await;
        };

        let proxy_err = match proxy.forward(user_id, request).await {
            Ok(response) => return Ok(response),
            Err(e @ GatewayError::ProxyTransport(_)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            user_id,
            path = %request.path,
            error = %proxy_err,
            "proxy unavailable; falling back to direct mode"
        );

        match resolve_active(self.credentials.as_ref(), user_id) {
            Ok(credentials) => self.direct.send(&credentials, request).await,
            Err(resolve_err) if resolve_err.is_credential_resolution() => {
                tracing::warn!(
                    user_id,
                    error = %resolve_err,
                    "direct mode has no usable credential; returning proxy error"
                );
                Err(proxy_err)
            }
            Err(other) => Err(other),
        }
    }

    /// Performs `request` in-process, bypassing any configured proxy.
    ///
    /// # Errors
    ///
    /// See [`MarketplaceGateway::call`].
    pub async fn call_direct(
        &self,
        user_id: &str,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let credentials = resolve_active(self.credentials.as_ref(), user_id)?;
        self.direct.send(&credentials, request).await
    }

    /// Pushes a new sale price for one vendor item.
    ///
    /// # Errors
    ///
    /// See [`MarketplaceGateway::call`].
    pub async fn update_price(
        &self,
        user_id: &str,
        vendor_item_id: &str,
        price: i64,
    ) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::new(Method::PUT, price_update_path(vendor_item_id, price));
        self.call(user_id, &request).await
    }
}
