//! Direct, signed HTTP client for the marketplace Open API.
//!
//! Every attempt is signed with a fresh timestamp. Non-2xx answers are not
//! errors: the status and the best-effort JSON body are returned as-is so the
//! caller can inspect them.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use sourcing_core::CredentialRecord;

use crate::error::GatewayError;
use crate::retry::{parse_retry_after, retry_delay};
use crate::signer::sign;
use crate::types::{parse_body_or_empty, GatewayRequest, GatewayResponse};

pub const DEFAULT_BASE_URL: &str = sourcing_core::DEFAULT_MARKETPLACE_BASE_URL;
pub const SIGNED_DATE_HEADER: &str = "x-coupang-date";
pub const REQUESTED_BY_HEADER: &str = "x-requested-by";

/// Client for the marketplace gateway. Use [`GatewayClient::new`] for
/// production or [`GatewayClient::with_base_url`] to point at a mock server.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    max_429_retries: u32,
    backoff_base_ms: u64,
}

impl GatewayClient {
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, GatewayError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GatewayError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sourcing/0.1 (marketplace-gateway)")
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| GatewayError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            max_429_retries: 0,
            backoff_base_ms: 1_000,
        })
    }

    /// Enables bounded retry of HTTP 429 responses.
    #[must_use]
    pub fn with_rate_limit_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_429_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signs and sends `request` with `credentials`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Http`] on network failure or timeout.
    /// - [`GatewayError::Signing`] if the request cannot be signed.
    pub async fn send(
        &self,
        credentials: &CredentialRecord,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut attempt = 0u32;
        loop {
            let (response, retry_after) = self.send_once(credentials, request).await?;
            if response.status != StatusCode::TOO_MANY_REQUESTS.as_u16()
                || attempt >= self.max_429_retries
            {
                if !response.is_success() {
                    tracing::debug!(
                        status = response.status,
                        path = %request.path,
                        "marketplace returned non-success status"
                    );
                }
                return Ok(response);
            }

            attempt += 1;
            let delay = retry_delay(attempt, retry_after, self.backoff_base_ms);
            tracing::warn!(
                attempt,
                max_retries = self.max_429_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                path = %request.path,
                "marketplace rate limited; retrying after back-off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(
        &self,
        credentials: &CredentialRecord,
        request: &GatewayRequest,
    ) -> Result<(GatewayResponse, Option<Duration>), GatewayError> {
        let signed = sign(
            request.method.as_str(),
            &request.path,
            &request.query,
            &credentials.access_key,
            &credentials.secret_key,
            Utc::now(),
        )?;

        let headers = signed_headers(
            &signed.authorization,
            &signed.signed_date,
            credentials.requester_id(),
        )?;
        let url = format!("{}{}", self.base_url, request.path_and_query());

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = request.payload() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let bytes = resp.bytes().await.ok();

        Ok((
            GatewayResponse {
                status,
                body: parse_body_or_empty(bytes.as_deref()),
            },
            retry_after,
        ))
    }
}

fn signed_headers(
    authorization: &str,
    signed_date: &str,
    requested_by: &str,
) -> Result<HeaderMap, GatewayError> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|e| GatewayError::Signing(format!("invalid header value: {e}")))
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, value(authorization)?);
    headers.insert(SIGNED_DATE_HEADER, value(signed_date)?);
    headers.insert(REQUESTED_BY_HEADER, value(requested_by)?);
    Ok(headers)
}
