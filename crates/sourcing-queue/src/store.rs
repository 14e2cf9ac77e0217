//! Persistence for the registration queue.
//!
//! The whole ordered list is the unit of read and write. Insertion order is
//! the audit order. There is no locking: callers must not run two sweeps
//! against the same store at once.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sourcing_core::{QueueItem, QueueStatus};

use crate::error::StoreError;

pub trait QueueStore: Send + Sync {
    /// Returns every item in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read or parsed.
    fn load(&self) -> Result<Vec<QueueItem>, StoreError>;

    /// Replaces the stored list with `items` in one step. A reader never sees
    /// a partially written list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if two items share an id, or an
    /// I/O / serialization error.
    fn save(&self, items: &[QueueItem]) -> Result<(), StoreError>;
}

/// Items currently in `status`, in store order.
#[must_use]
pub fn filter_by_status<'a>(items: &'a [QueueItem], status: &QueueStatus) -> Vec<&'a QueueItem> {
    items.iter().filter(|item| &item.status == status).collect()
}

/// Records without any identifier are exempt: the pipeline may write them
/// before a product number is known.
fn ensure_unique_ids(items: &[QueueItem]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        let key = item.key();
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key.clone()) {
            return Err(StoreError::DuplicateId(key.into_owned()));
        }
    }
    Ok(())
}

/// Pretty-printed JSON array on disk.
///
/// Saves go to a sibling temp file first and are renamed over the target, so
/// a crash mid-write leaves the previous list intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl QueueStore for JsonFileStore {
    fn load(&self) -> Result<Vec<QueueItem>, StoreError> {
        // A queue that was never written is an empty queue.
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<QueueItem> =
            serde_json::from_str(&content).map_err(|e| StoreError::Deserialize {
                path: self.path.display().to_string(),
                source: e,
            })?;
        ensure_unique_ids(&items)?;

        tracing::debug!(path = %self.path.display(), count = items.len(), "loaded queue");
        Ok(items)
    }

    fn save(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        ensure_unique_ids(items)?;
        let body = serde_json::to_string_pretty(items).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, body).map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        tracing::debug!(path = %self.path.display(), count = items.len(), "saved queue");
        Ok(())
    }
}

/// In-process store, used by tests and dry tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Vec<QueueItem>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(items: Vec<QueueItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueStore for MemoryStore {
    fn load(&self) -> Result<Vec<QueueItem>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        ensure_unique_ids(items)?;
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = items.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_queue_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("sourcing-queue-{}", uuid::Uuid::new_v4()))
            .join("register_queue.json")
    }

    fn item(id: &str, status: QueueStatus) -> QueueItem {
        let mut item = QueueItem::new(id, status);
        item.sale_price = Some(10_000);
        item
    }

    #[test]
    fn missing_file_loads_as_empty_queue() {
        let store = JsonFileStore::new(temp_queue_path());
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let path = temp_queue_path();
        let store = JsonFileStore::new(&path);
        let mut first = item("b", QueueStatus::Pending);
        first
            .extra
            .insert("imageUrl".to_owned(), serde_json::json!("https://x/1.jpg"));
        let items = vec![first, item("a", QueueStatus::Registered)];

        store.save(&items).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(loaded, items);
        assert!(!store.temp_path().exists(), "temp file must be renamed away");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn save_rejects_duplicate_ids_and_keeps_previous_file() {
        let path = temp_queue_path();
        let store = JsonFileStore::new(&path);
        store.save(&[item("a", QueueStatus::Pending)]).unwrap();

        let err = store
            .save(&[item("x", QueueStatus::Pending), item("x", QueueStatus::Error)])
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "x"));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "a");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn loads_pipeline_records_without_id() {
        let path = temp_queue_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let raw = r#"[
            {"sellerName":"블루투스 이어폰","domeggookProductNo":"123","salePrice":30000,
             "status":"error","sourcePrice":5000,"retryCount":1,"error":"timeout"},
            {"sellerName":"캠핑 의자","domeggookProductNo":456,"status":"pending"},
            {"sellerName":"미분류","status":"pending"},
            {"sellerName":"미분류 2","status":"pending"}
        ]"#;
        std::fs::write(&path, raw).unwrap();
        let store = JsonFileStore::new(&path);

        let items = store.load().expect("pipeline records load");
        let keys: Vec<String> = items.iter().map(|i| i.key().into_owned()).collect();
        assert_eq!(keys, ["123", "456", "", ""]);
        assert_eq!(items[0].status, QueueStatus::Error);
        assert_eq!(items[0].retry_count, Some(1));

        store.save(&items).expect("save");
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written[0].get("id").is_none());
        assert_eq!(written[1]["domeggookProductNo"], 456);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn duplicate_product_numbers_are_rejected() {
        let mut a = QueueItem::new("", QueueStatus::Pending);
        a.extra.insert("domeggookProductNo".to_owned(), serde_json::json!("9"));
        let b = a.clone();
        let store = MemoryStore::default();

        let err = store.save(&[a, b]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "9"));
    }

    #[test]
    fn load_reports_malformed_file() {
        let path = temp_queue_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Deserialize { .. }));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn filter_by_status_is_read_only() {
        let items = vec![
            item("a", QueueStatus::Error),
            item("b", QueueStatus::Pending),
            item("c", QueueStatus::Error),
        ];
        let errors = filter_by_status(&items, &QueueStatus::Error);
        let ids: Vec<&str> = errors.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::default();
        store.save(&[item("a", QueueStatus::Pending)]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
        assert!(store
            .save(&[item("a", QueueStatus::Pending), item("a", QueueStatus::Pending)])
            .is_err());
    }
}
