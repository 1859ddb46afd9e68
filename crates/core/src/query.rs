use serde_json::{json, Value};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

const NAME_BOOST: f64 = 3.0;
const FRAGMENT_SIZE: u32 = 140;
const FRAGMENTS_PER_PAGE: u32 = 3;
const HIGHLIGHT_PRE: &str = "<em>";
const HIGHLIGHT_POST: &str = "</em>";

/// Builds the ranked search body for one user query, or `None` when the
/// query is empty so callers can short-circuit without touching the
/// backend.
///
/// Three independent relevance signals are OR-combined: a boosted match on
/// the original filename, a tag-set match on the tokenized query, and a
/// nested per-page full-text match carrying page-scoped highlighting.
pub fn plan_search(query: &str, page: u64, page_size: u64) -> Option<Value> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let tokens: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    Some(json!({
        "from": offset(page, page_size),
        "size": page_size,
        "track_total_hits": true,
        "query": {
            "bool": {
                "should": [
                    {
                        "match": {
                            "original_name": {
                                "query": query,
                                "boost": NAME_BOOST
                            }
                        }
                    },
                    {
                        "terms": { "tags": tokens }
                    },
                    {
                        "nested": {
                            "path": "pages",
                            "query": {
                                "match": { "pages.text": query }
                            },
                            "inner_hits": {
                                "highlight": {
                                    "fields": {
                                        "pages.text": {
                                            "fragment_size": FRAGMENT_SIZE,
                                            "number_of_fragments": FRAGMENTS_PER_PAGE,
                                            "pre_tags": [HIGHLIGHT_PRE],
                                            "post_tags": [HIGHLIGHT_POST]
                                        }
                                    }
                                }
                            }
                        }
                    }
                ],
                "minimum_should_match": 1
            }
        }
    }))
}

/// Match-all body for corpus listing, newest uploads first.
pub fn plan_list(page: u64, page_size: u64) -> Value {
    json!({
        "from": offset(page, page_size),
        "size": page_size,
        "track_total_hits": true,
        "query": { "match_all": {} },
        "sort": [{ "uploaded_at": { "order": "desc" } }]
    })
}

fn offset(page: u64, page_size: u64) -> u64 {
    (page.max(1) - 1) * page_size
}

/// Document-level page count: at least one page whenever anything matched.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if total == 0 {
        0
    } else {
        ((total + page_size - 1) / page_size).max(1)
    }
}
