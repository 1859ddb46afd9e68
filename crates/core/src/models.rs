use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One physical page of an ingested PDF, independently matchable in the
/// search backend as a nested sub-document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPage {
    pub page_number: u32,
    pub text: String,
}

/// A fully ingested document as persisted in the search backend. Every
/// field is fixed at ingestion time; the backend assigns `id` on the
/// index write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub stored_name: String,
    pub original_name: String,
    pub content_hash: String,
    pub author: String,
    pub byte_size: u64,
    pub tags: Vec<String>,
    pub pages: Vec<DocumentPage>,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub storage_path: String,
}

impl PdfDocument {
    /// Composes the immutable upload metadata with the derived fields into
    /// one record, ready for the index write.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        stored_name: String,
        original_name: String,
        fingerprint: &crate::fingerprint::Fingerprint,
        tags: Vec<String>,
        pages: Vec<DocumentPage>,
        uploaded_by: String,
        storage_path: String,
    ) -> Self {
        Self {
            id: None,
            stored_name,
            original_name,
            content_hash: fingerprint.content_hash.clone(),
            author: fingerprint.author.clone(),
            byte_size: fingerprint.byte_size,
            tags,
            pages,
            uploaded_at: Utc::now(),
            uploaded_by,
            storage_path,
        }
    }
}

/// Result of one ingestion attempt. A duplicate is an expected business
/// outcome, not an error: the caller owns discarding the freshly stored
/// blob at `stored_path`.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Indexed { id: String, document: PdfDocument },
    Duplicate { existing_id: String, stored_path: String },
}

/// One search result entry, folded from every per-page hit of the same
/// source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResultItem {
    pub document_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    pub excerpts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// A document-level page of search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
}

impl SearchPage {
    pub fn empty(page: u64) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            total_pages: 0,
            page,
        }
    }
}
