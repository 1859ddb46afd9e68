use crate::aggregate::{aggregate, parse_envelope};
use crate::cache::{CacheStore, ResponseCache};
use crate::error::{IngestError, SearchError};
use crate::extractor::PdfExtractor;
use crate::fingerprint::fingerprint;
use crate::models::{IngestOutcome, PdfDocument, SearchPage};
use crate::query::{plan_list, plan_search, DEFAULT_PAGE_SIZE};
use crate::storage::{generate_stored_name, BlobStorage};
use crate::tags::{extract_tags, DEFAULT_TAG_LIMIT};
use crate::traits::DocumentIndex;
use tracing::{error, warn};

pub const SEARCH_ROUTE: &str = "/pdfs/search";
pub const LIST_ROUTE: &str = "/pdfs";

/// Orchestrates the whole pipeline: deduplicated ingestion into the search
/// backend, cached and paginated reads out of it, and the version-bump
/// protocol that keeps the two coherent.
pub struct PdfArchive<I, S, X, C>
where
    I: DocumentIndex,
    S: BlobStorage,
    X: PdfExtractor,
    C: CacheStore,
{
    index: I,
    storage: S,
    extractor: X,
    cache: ResponseCache<C>,
    page_size: u64,
}

impl<I, S, X, C> PdfArchive<I, S, X, C>
where
    I: DocumentIndex + Send + Sync,
    S: BlobStorage + Send + Sync,
    X: PdfExtractor + Send + Sync,
    C: CacheStore + Send + Sync,
{
    pub fn new(index: I, storage: S, extractor: X, cache: ResponseCache<C>) -> Self {
        Self {
            index,
            storage,
            extractor,
            cache,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub async fn ensure_ready(&self) -> Result<(), SearchError> {
        self.index.ensure_index().await
    }

    /// Ingests one uploaded PDF: store the raw bytes, extract per-page
    /// text, fingerprint, reject duplicates, tag, index with immediate
    /// visibility, then bump the cache version.
    ///
    /// On a `Duplicate` outcome the freshly stored blob is left in place;
    /// discarding it is the caller's call.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        original_name: &str,
        uploaded_by: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let stored_name = generate_stored_name(original_name);
        let storage_path = self.storage.store(bytes, &stored_name)?;

        let extracted = match self.extractor.extract(bytes) {
            Ok(extracted) => extracted,
            Err(extract_error) => {
                // A blob without an index entry is an orphan; try to remove
                // it, but never let cleanup mask the extraction failure.
                if let Err(cleanup_error) = self.storage.delete(&storage_path) {
                    warn!(
                        %cleanup_error,
                        path = %storage_path,
                        "failed to remove blob after extraction failure"
                    );
                }
                return Err(extract_error);
            }
        };

        let full_text = extracted.full_text();
        let print = fingerprint(&full_text, extracted.author.as_deref(), bytes.len() as u64);

        if let Some(existing_id) = self.index.find_duplicate(&print).await? {
            return Ok(IngestOutcome::Duplicate {
                existing_id,
                stored_path: storage_path,
            });
        }

        let tags = extract_tags(&full_text, DEFAULT_TAG_LIMIT);
        let mut document = PdfDocument::build(
            stored_name,
            original_name.to_string(),
            &print,
            tags,
            extracted.pages,
            uploaded_by.to_string(),
            storage_path,
        );

        let id = self.index.index_document(&document).await?;
        document.id = Some(id.clone());

        // The index write is already visible; failing to bump here leaves
        // stale cached reads behind, so it must be loud.
        if let Err(bump_error) = self.cache.bump().await {
            error!(
                %bump_error,
                document_id = %id,
                "cache version bump failed after index write; cached reads are stale until re-bumped"
            );
        }

        Ok(IngestOutcome::Indexed { id, document })
    }

    /// Discards the blob stored for an upload that turned out to be a
    /// duplicate.
    pub fn discard_blob(&self, stored_path: &str) -> Result<(), IngestError> {
        self.storage.delete(stored_path)
    }

    /// Cached, paginated, document-grouped search. An empty query returns
    /// the empty page without touching the backend or the cache.
    pub async fn search(&self, query: &str, page: u64) -> Result<SearchPage, SearchError> {
        let page = page.max(1);
        let body = match plan_search(query, page, self.page_size) {
            Some(body) => body,
            None => return Ok(SearchPage::empty(page)),
        };

        let page_param = page.to_string();
        let params = [("page", page_param.as_str()), ("q", query.trim())];
        self.cached_query(SEARCH_ROUTE, &params, &body, page).await
    }

    /// Cached corpus listing, newest uploads first.
    pub async fn list(&self, page: u64) -> Result<SearchPage, SearchError> {
        let page = page.max(1);
        let body = plan_list(page, self.page_size);

        let page_param = page.to_string();
        let params = [("page", page_param.as_str())];
        self.cached_query(LIST_ROUTE, &params, &body, page).await
    }

    async fn cached_query(
        &self,
        route: &str,
        params: &[(&str, &str)],
        body: &serde_json::Value,
        page: u64,
    ) -> Result<SearchPage, SearchError> {
        if let Some(cached) = self.cache.read(route, params).await {
            match serde_json::from_str::<SearchPage>(&cached) {
                Ok(result) => return Ok(result),
                Err(parse_error) => {
                    warn!(%parse_error, route, "cached body failed to parse, refetching");
                }
            }
        }

        let raw = self.index.search(body).await?;
        let envelope = parse_envelope(raw)?;
        let result = aggregate(&envelope, page, self.page_size);

        match serde_json::to_string(&result) {
            Ok(serialized) => self.cache.write(route, params, &serialized).await,
            Err(serialize_error) => {
                warn!(%serialize_error, route, "response not cacheable");
            }
        }

        Ok(result)
    }

    /// Streams back the stored bytes for one indexed document,
    /// distinguishing a missing index entry from a missing blob.
    pub async fn open_document(&self, document_id: &str) -> Result<Vec<u8>, SearchError> {
        let document = self
            .index
            .get_document(document_id)
            .await?
            .ok_or_else(|| SearchError::DocumentNotFound(document_id.to_string()))?;

        if !self.storage.exists(&document.storage_path) {
            return Err(SearchError::BlobMissing(document_id.to_string()));
        }

        self.storage
            .read(&document.storage_path)
            .map_err(|read_error| SearchError::Request(format!("blob read failed: {read_error}")))
    }

    /// Administrative: drops every cached response outright, independent of
    /// version bumping.
    pub async fn clear_cache(&self) -> Result<(), SearchError> {
        self.cache.clear().await
    }

    /// Administrative full reset: all blobs deleted, the index recreated,
    /// and the cache invalidated.
    pub async fn reset_corpus(&self) -> Result<(), IngestError> {
        self.storage.clear()?;
        self.index.reset().await?;

        if let Err(bump_error) = self.cache.bump().await {
            error!(%bump_error, "cache version bump failed after corpus reset");
        }
        if let Err(clear_error) = self.cache.clear().await {
            warn!(%clear_error, "cache clear failed after corpus reset");
        }
        Ok(())
    }

    pub async fn document_count(&self) -> Result<u64, SearchError> {
        self.index.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, ResponseCache};
    use crate::extractor::ExtractedPdf;
    use crate::fingerprint::Fingerprint;
    use crate::models::DocumentPage;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIndex {
        documents: Mutex<Vec<PdfDocument>>,
        search_response: Option<Value>,
        search_calls: AtomicU64,
    }

    #[async_trait]
    impl DocumentIndex for FakeIndex {
        async fn ensure_index(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn find_duplicate(
            &self,
            fingerprint: &Fingerprint,
        ) -> Result<Option<String>, SearchError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .iter()
                .find(|doc| {
                    doc.content_hash == fingerprint.content_hash
                        && doc.author == fingerprint.author
                        && doc.byte_size == fingerprint.byte_size
                })
                .and_then(|doc| doc.id.clone()))
        }

        async fn index_document(&self, document: &PdfDocument) -> Result<String, SearchError> {
            let mut documents = self.documents.lock().unwrap();
            let id = format!("doc-{}", documents.len() + 1);
            let mut stored = document.clone();
            stored.id = Some(id.clone());
            documents.push(stored);
            Ok(id)
        }

        async fn search(&self, _body: &Value) -> Result<Value, SearchError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .search_response
                .clone()
                .unwrap_or_else(|| json!({"hits": {"total": {"value": 0}, "hits": []}})))
        }

        async fn get_document(&self, id: &str) -> Result<Option<PdfDocument>, SearchError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .iter()
                .find(|doc| doc.id.as_deref() == Some(id))
                .cloned())
        }

        async fn reset(&self) -> Result<(), SearchError> {
            self.documents.lock().unwrap().clear();
            Ok(())
        }

        async fn count(&self) -> Result<u64, SearchError> {
            Ok(self.documents.lock().unwrap().len() as u64)
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl BlobStorage for FakeStorage {
        fn store(&self, bytes: &[u8], stored_name: &str) -> Result<String, IngestError> {
            let path = format!("/blobs/{stored_name}");
            self.blobs
                .lock()
                .unwrap()
                .insert(path.clone(), bytes.to_vec());
            Ok(path)
        }

        fn exists(&self, path: &str) -> bool {
            self.blobs.lock().unwrap().contains_key(path)
        }

        fn read(&self, path: &str) -> Result<Vec<u8>, IngestError> {
            self.blobs
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| IngestError::Storage(format!("missing blob: {path}")))
        }

        fn delete(&self, path: &str) -> Result<(), IngestError> {
            self.blobs.lock().unwrap().remove(path);
            Ok(())
        }

        fn clear(&self) -> Result<(), IngestError> {
            self.blobs.lock().unwrap().clear();
            Ok(())
        }
    }

    struct FakeExtractor {
        pages: Vec<DocumentPage>,
        author: Option<String>,
        fail: bool,
    }

    impl PdfExtractor for FakeExtractor {
        fn extract(&self, _bytes: &[u8]) -> Result<ExtractedPdf, IngestError> {
            if self.fail {
                return Err(IngestError::Extraction("unreadable pdf".to_string()));
            }
            Ok(ExtractedPdf {
                pages: self.pages.clone(),
                author: self.author.clone(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        version: AtomicU64,
        entries: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CacheStore for MemoryStore {
        async fn current_version(&self) -> Result<u64, SearchError> {
            let _ = self
                .version
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst);
            Ok(self.version.load(Ordering::SeqCst))
        }

        async fn bump_version(&self) -> Result<u64, SearchError> {
            Ok(self.version.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn get(&self, key: &str) -> Result<Option<String>, SearchError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, body: &str, _ttl_secs: u64) -> Result<(), SearchError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), body.to_string());
            Ok(())
        }

        async fn clear_namespace(&self) -> Result<(), SearchError> {
            self.entries.lock().unwrap().clear();
            Ok(())
        }
    }

    fn sample_extractor() -> FakeExtractor {
        FakeExtractor {
            pages: vec![DocumentPage {
                page_number: 1,
                text: "Bonjour elasticsearch. Bonjour pdf. Auteur X.".to_string(),
            }],
            author: Some("Auteur X".to_string()),
            fail: false,
        }
    }

    fn archive(
        index: FakeIndex,
        extractor: FakeExtractor,
    ) -> PdfArchive<FakeIndex, FakeStorage, FakeExtractor, MemoryStore> {
        PdfArchive::new(
            index,
            FakeStorage::default(),
            extractor,
            ResponseCache::new(MemoryStore::default(), 60),
        )
    }

    #[tokio::test]
    async fn second_identical_upload_is_a_duplicate() {
        let archive = archive(FakeIndex::default(), sample_extractor());
        let bytes = vec![0u8; 1234];

        let first = archive.ingest(&bytes, "rapport.pdf", "user-1").await.unwrap();
        let id = match first {
            IngestOutcome::Indexed { id, ref document } => {
                assert!(document.tags.contains(&"bonjour".to_string()));
                assert!(document.tags.contains(&"elasticsearch".to_string()));
                assert!(document.tags.contains(&"auteur".to_string()));
                assert_eq!(document.author, "Auteur X");
                id
            }
            other => panic!("expected Indexed, got {other:?}"),
        };

        let second = archive.ingest(&bytes, "rapport.pdf", "user-2").await.unwrap();
        match second {
            IngestOutcome::Duplicate { existing_id, .. } => assert_eq!(existing_id, id),
            other => panic!("expected Duplicate, got {other:?}"),
        }

        assert_eq!(archive.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ingest_bumps_the_cache_version() {
        let archive = archive(FakeIndex::default(), sample_extractor());

        let before = archive.cache.version().await.unwrap();
        archive.ingest(b"bytes", "a.pdf", "user-1").await.unwrap();
        let after = archive.cache.version().await.unwrap();
        assert!(after > before);
    }

    #[tokio::test]
    async fn extraction_failure_cleans_up_the_stored_blob() {
        let archive = archive(
            FakeIndex::default(),
            FakeExtractor {
                pages: Vec::new(),
                author: None,
                fail: true,
            },
        );

        let result = archive.ingest(b"broken", "broken.pdf", "user-1").await;
        assert!(matches!(result, Err(IngestError::Extraction(_))));
        assert!(archive.storage.blobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_never_reaches_the_backend() {
        let archive = archive(FakeIndex::default(), sample_extractor());

        let result = archive.search("   ", 1).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(archive.index.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_search_is_served_from_cache() {
        let index = FakeIndex {
            search_response: Some(json!({
                "hits": {
                    "total": { "value": 1 },
                    "hits": [{
                        "_id": "doc-1",
                        "_source": { "original_name": "rapport.pdf" },
                        "inner_hits": { "pages": { "hits": { "hits": [{
                            "_source": { "page_number": 5 },
                            "highlight": { "pages.text": ["foo <em>bar</em> baz"] }
                        }] } } }
                    }]
                }
            })),
            ..Default::default()
        };
        let archive = archive(index, sample_extractor());

        let first = archive.search("bar", 1).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].page_number, Some(5));
        assert!(first.items[0].excerpts[0].contains("<em>bar</em>"));

        let second = archive.search("bar", 1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(archive.index.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_clear_forces_the_next_query_to_miss() {
        let archive = archive(FakeIndex::default(), sample_extractor());

        archive.search("x", 1).await.unwrap();
        assert_eq!(archive.index.search_calls.load(Ordering::SeqCst), 1);

        archive.clear_cache().await.unwrap();
        archive.search("x", 1).await.unwrap();
        assert_eq!(archive.index.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reset_corpus_drops_blobs_and_documents() {
        let archive = archive(FakeIndex::default(), sample_extractor());
        archive.ingest(b"bytes", "a.pdf", "user-1").await.unwrap();

        archive.reset_corpus().await.unwrap();
        assert_eq!(archive.document_count().await.unwrap(), 0);
        assert!(archive.storage.blobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_document_distinguishes_missing_metadata_from_missing_blob() {
        let archive = archive(FakeIndex::default(), sample_extractor());
        let outcome = archive.ingest(b"bytes", "a.pdf", "user-1").await.unwrap();
        let id = match outcome {
            IngestOutcome::Indexed { id, .. } => id,
            other => panic!("expected Indexed, got {other:?}"),
        };

        assert_eq!(archive.open_document(&id).await.unwrap(), b"bytes");
        assert!(matches!(
            archive.open_document("nope").await,
            Err(SearchError::DocumentNotFound(_))
        ));

        archive.storage.clear().unwrap();
        assert!(matches!(
            archive.open_document(&id).await,
            Err(SearchError::BlobMissing(_))
        ));
    }
}
