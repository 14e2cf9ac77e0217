use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user marketplace credentials.
///
/// The credential-management collaborator keeps at most one record active per
/// user. Gateway code relies on that and refuses to guess when it is violated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub user_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub vendor_id: String,
    #[serde(default)]
    pub vendor_user_id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Identity sent in the `X-Requested-By` header.
    #[must_use]
    pub fn requester_id(&self) -> &str {
        &self.vendor_id
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("user_id", &self.user_id)
            .field("alias", &self.alias)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[redacted]")
            .field("vendor_id", &self.vendor_id)
            .field("vendor_user_id", &self.vendor_user_id)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .finish()
    }
}
