use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf extraction failed: {0}")]
    Extraction(String),

    #[error("blob storage error: {0}")]
    Storage(String),

    #[error("index error: {0}")]
    Index(#[from] SearchError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),

    #[error("cache store error: {0}")]
    Cache(String),

    #[error("no document indexed under id {0}")]
    DocumentNotFound(String),

    #[error("stored file is missing for document {0}")]
    BlobMissing(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
