use crate::error::SearchError;
use crate::models::{SearchPage, SearchResultItem};
use crate::query::total_pages;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Typed view of the backend's search response. Every field the backend
/// may omit is optional or defaulted, so shape drift is caught here at the
/// boundary instead of deep inside the aggregation.
#[derive(Debug, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub hits: HitsEnvelope,
}

#[derive(Debug, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: TotalEnvelope,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TotalEnvelope {
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: RawSource,
    #[serde(default)]
    pub inner_hits: Option<RawInnerHits>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RawInnerHits {
    #[serde(default)]
    pub pages: Option<RawInnerHitsPages>,
}

#[derive(Debug, Deserialize)]
pub struct RawInnerHitsPages {
    #[serde(default)]
    pub hits: RawInnerHitList,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawInnerHitList {
    #[serde(default)]
    pub hits: Vec<RawPageHit>,
}

#[derive(Debug, Deserialize)]
pub struct RawPageHit {
    #[serde(rename = "_source", default)]
    pub source: RawPageSource,
    #[serde(default)]
    pub highlight: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPageSource {
    #[serde(default)]
    pub page_number: Option<u32>,
}

pub fn parse_envelope(raw: Value) -> Result<SearchEnvelope, SearchError> {
    Ok(serde_json::from_value(raw)?)
}

/// Regroups flat per-page hits into one entry per source document.
///
/// Hits sharing a document id merge in arrival order; every highlight
/// fragment is normalized and inserted once, so identical excerpts from
/// different pages are suppressed. A hit without inner hits (a pure
/// filename or tag match) still produces an item, with no excerpts.
/// Idempotent: the same envelope always folds to the same page.
pub fn aggregate(envelope: &SearchEnvelope, page: u64, page_size: u64) -> SearchPage {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, SearchResultItem> = HashMap::new();
    let mut seen_excerpts: HashMap<String, HashSet<String>> = HashMap::new();

    for hit in &envelope.hits.hits {
        let item = grouped.entry(hit.id.clone()).or_insert_with(|| {
            order.push(hit.id.clone());
            SearchResultItem {
                document_id: hit.id.clone(),
                file_name: hit.source.original_name.clone().unwrap_or_default(),
                uploaded_at: hit.source.uploaded_at,
                excerpts: Vec::new(),
                page_number: None,
            }
        });
        let seen = seen_excerpts.entry(hit.id.clone()).or_default();

        let page_hits = hit
            .inner_hits
            .as_ref()
            .and_then(|inner| inner.pages.as_ref())
            .map(|pages| pages.hits.hits.as_slice())
            .unwrap_or_default();

        for page_hit in page_hits {
            if item.page_number.is_none() {
                item.page_number = page_hit.source.page_number;
            }
            for fragment in page_hit.highlight.values().flatten() {
                let normalized = normalize_fragment(fragment);
                if normalized.is_empty() {
                    continue;
                }
                if seen.insert(normalized.clone()) {
                    item.excerpts.push(normalized);
                }
            }
        }
    }

    let total = envelope.hits.total.value;
    SearchPage {
        items: order
            .into_iter()
            .filter_map(|id| grouped.remove(&id))
            .collect(),
        total,
        total_pages: total_pages(total, page_size),
        page,
    }
}

/// Collapses internal whitespace, strips soft-hyphen artifacts left by PDF
/// line breaking, and trims.
pub fn normalize_fragment(fragment: &str) -> String {
    fragment
        .replace('\u{00AD}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
