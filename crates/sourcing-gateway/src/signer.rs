//! CEA request signing for the marketplace Open API.
//!
//! The canonical message is `signed_date ∥ method ∥ path ∥ query` with no
//! separators; the query is the raw string without a leading `?`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// `YYMMDDTHHMMSSZ` in UTC.
pub const SIGNED_DATE_FORMAT: &str = "%y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub signed_date: String,
    pub signature: String,
    /// Full `Authorization` header value.
    pub authorization: String,
}

#[must_use]
pub fn signed_date(now: DateTime<Utc>) -> String {
    now.format(SIGNED_DATE_FORMAT).to_string()
}

/// Signs one request. Call once per attempt with a fresh `now`; a reused
/// timestamp is rejected upstream as clock skew.
///
/// # Errors
///
/// Returns [`GatewayError::Signing`] if the HMAC cannot be keyed.
pub fn sign(
    method: &str,
    path: &str,
    query: &str,
    access_key: &str,
    secret_key: &str,
    now: DateTime<Utc>,
) -> Result<SignedRequest, GatewayError> {
    let signed_date = signed_date(now);
    let message = format!("{signed_date}{method}{path}{query}");

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| GatewayError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let authorization = format!(
        "CEA algorithm=HmacSHA256, access-key={access_key}, signed-date={signed_date}, signature={signature}"
    );

    Ok(SignedRequest {
        signed_date,
        signature,
        authorization,
    })
}
