use crate::error::SearchError;
use crate::fingerprint::Fingerprint;
use crate::models::PdfDocument;
use async_trait::async_trait;
use serde_json::Value;

/// The full-text search backend holding the document corpus.
#[async_trait]
pub trait DocumentIndex {
    async fn ensure_index(&self) -> Result<(), SearchError>;

    /// Bounded lookup for an already-indexed document with the same
    /// fingerprint; returns its id when ingestion must be rejected as a
    /// duplicate.
    async fn find_duplicate(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<String>, SearchError>;

    /// Writes one document and makes it immediately visible to reads.
    /// Returns the backend-assigned id.
    async fn index_document(&self, document: &PdfDocument) -> Result<String, SearchError>;

    async fn search(&self, body: &Value) -> Result<Value, SearchError>;

    async fn get_document(&self, id: &str) -> Result<Option<PdfDocument>, SearchError>;

    /// Drops and recreates the whole index namespace.
    async fn reset(&self) -> Result<(), SearchError>;

    async fn count(&self) -> Result<u64, SearchError>;
}
