pub mod enrich;
pub mod error;
pub mod recovery;
pub mod store;

pub use enrich::{enrich_all, fan_out, EnrichReport};
pub use error::StoreError;
pub use recovery::{
    retry_sweep, run_retry_sweep, RetryOptions, RetryOutcome, RetryReport, DEFAULT_MAX_RETRIES,
};
pub use store::{filter_by_status, JsonFileStore, MemoryStore, QueueStore};
