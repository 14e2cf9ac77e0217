use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("failed to read multiplier table {path}: {source}")]
    TableIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse multiplier table {path}: {source}")]
    TableParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid multiplier table: {0}")]
    TableValidation(String),

    #[error(transparent)]
    Store(#[from] sourcing_queue::StoreError),
}
