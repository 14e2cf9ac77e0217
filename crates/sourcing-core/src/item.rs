use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::status::QueueStatus;

/// Wholesale catalogue number written by the sourcing pipeline. Kept in
/// `extra` so its original JSON type survives a save.
const SOURCE_PRODUCT_NO_FIELD: &str = "domeggookProductNo";

/// One sourcing / registration candidate tracked through the pipeline.
///
/// Field names serialize in camelCase so the queue file stays readable next to
/// the tools that populate it. Fields this crate does not model are kept in
/// [`QueueItem::extra`] and written back untouched.
///
/// Records written by the sourcing pipeline carry no `id`; see
/// [`QueueItem::key`] for how such records are identified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Explicit identifier. Empty when the record never had one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub status: QueueStatus,

    /// Marketplace seller-product id, assigned once registration succeeds.
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub vendor_item_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_source_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_rate: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_sale_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_fixed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    // Scratch flags left behind by a failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_timed_out: Option<bool>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QueueItem {
    #[must_use]
    pub fn new(id: impl Into<String>, status: QueueStatus) -> Self {
        Self {
            id: id.into(),
            status,
            product_id: None,
            vendor_item_id: None,
            display_name: None,
            seller_name: None,
            category: None,
            source_price: None,
            latest_source_price: None,
            sale_price: None,
            unit_cost: None,
            margin: None,
            margin_rate: None,
            old_sale_price: None,
            price_fixed_at: None,
            retry_count: None,
            error: None,
            last_error: None,
            optimized: None,
            seo_timed_out: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Stable identity of the record.
    ///
    /// `id` when present, else the wholesale product number the pipeline
    /// records at sourcing time, else the marketplace ids. Empty if the record
    /// has none of these.
    #[must_use]
    pub fn key(&self) -> Cow<'_, str> {
        if !self.id.is_empty() {
            return Cow::Borrowed(self.id.as_str());
        }
        match self.extra.get(SOURCE_PRODUCT_NO_FIELD) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Cow::Borrowed(s.as_str()),
            Some(serde_json::Value::Number(n)) => return Cow::Owned(n.to_string()),
            _ => {}
        }
        self.product_id
            .as_deref()
            .or(self.vendor_item_id.as_deref())
            .map_or(Cow::Borrowed(""), Cow::Borrowed)
    }

    /// Name used for category matching: `displayName`, then `sellerName`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.seller_name.as_deref())
            .unwrap_or("")
    }

    /// Wholesale unit cost, falling back to the latest re-crawled cost.
    /// Zero is treated as absent.
    #[must_use]
    pub fn effective_source_price(&self) -> Option<i64> {
        self.source_price
            .filter(|p| *p != 0)
            .or(self.latest_source_price.filter(|p| *p != 0))
    }

    /// Moves the item to `next` if the state machine allows it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalTransition`] when `next` is not a legal
    /// successor of the current status. `error -> pending` is always rejected
    /// here; use [`QueueItem::recover_for_retry`].
    pub fn transition_to(&mut self, next: QueueStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(&next) {
            return Err(CoreError::IllegalTransition {
                item_id: self.key().into_owned(),
                from: self.status.clone(),
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Records a failed workflow step. `retryCount` is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalTransition`] if the item is not in an
    /// active state.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.transition_to(QueueStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Explicit user deletion. The record stays in the store for audit.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalTransition`] if the item is already deleted.
    pub fn mark_deleted(&mut self) -> Result<(), CoreError> {
        self.transition_to(QueueStatus::Deleted)
    }

    /// The attempt number the next retry would be.
    #[must_use]
    pub fn next_retry_attempt(&self) -> u32 {
        self.retry_count.unwrap_or(0).saturating_add(1)
    }

    /// Moves a failed item back to `pending` for another attempt.
    ///
    /// On success the current `error` is moved into `lastError`, the scratch
    /// flags are cleared and the new attempt number is returned.
    ///
    /// # Errors
    ///
    /// - [`CoreError::IllegalTransition`] if the item is not in `error`.
    /// - [`CoreError::RetriesExhausted`] if the next attempt would exceed
    ///   `max_retries`; the item is left untouched.
    pub fn recover_for_retry(&mut self, max_retries: u32) -> Result<u32, CoreError> {
        if self.status != QueueStatus::Error {
            return Err(CoreError::IllegalTransition {
                item_id: self.key().into_owned(),
                from: self.status.clone(),
                to: QueueStatus::Pending,
            });
        }

        let attempt = self.next_retry_attempt();
        if attempt > max_retries {
            return Err(CoreError::RetriesExhausted {
                item_id: self.key().into_owned(),
                attempt,
                max_retries,
            });
        }

        self.status = QueueStatus::Pending;
        self.retry_count = Some(attempt);
        self.last_error = self.error.take();
        self.optimized = None;
        self.seo_timed_out = None;
        Ok(attempt)
    }
}

/// Accepts marketplace ids written either as JSON strings or numbers.
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}
