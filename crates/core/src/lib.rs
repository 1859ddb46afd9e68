pub mod aggregate;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod ingest;
pub mod models;
pub mod query;
pub mod storage;
pub mod stores;
pub mod tags;
pub mod traits;

pub use aggregate::{aggregate, normalize_fragment, parse_envelope, SearchEnvelope};
pub use cache::{cache_key, CacheStore, RedisCacheStore, ResponseCache, DEFAULT_TTL_SECS};
pub use coordinator::{PdfArchive, LIST_ROUTE, SEARCH_ROUTE};
pub use error::{IngestError, SearchError};
pub use extractor::{ExtractedPdf, LopdfExtractor, PdfExtractor};
pub use fingerprint::{fingerprint, Fingerprint, UNKNOWN_AUTHOR};
pub use ingest::discover_pdf_files;
pub use models::{DocumentPage, IngestOutcome, PdfDocument, SearchPage, SearchResultItem};
pub use query::{plan_list, plan_search, total_pages, DEFAULT_PAGE_SIZE};
pub use storage::{generate_stored_name, BlobStorage, FsBlobStorage};
pub use stores::ElasticIndex;
pub use tags::{extract_tags, DEFAULT_TAG_LIMIT};
pub use traits::DocumentIndex;
