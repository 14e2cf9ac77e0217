use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("queue file I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("queue file {path} is not a valid item list: {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize queue: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("duplicate queue item id: {0}")]
    DuplicateId(String),
}
