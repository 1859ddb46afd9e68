use crate::error::SearchError;
use crate::fingerprint::Fingerprint;
use crate::models::PdfDocument;
use crate::traits::DocumentIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

/// Elasticsearch-backed document index, spoken to over plain HTTP.
pub struct ElasticIndex {
    client: Arc<Client>,
    endpoint: String,
    index_name: String,
}

impl ElasticIndex {
    pub fn new(endpoint: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            index_name: index_name.into(),
        }
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.index_name)
    }

    async fn create_index(&self) -> Result<(), SearchError> {
        let response = self
            .client
            .put(self.index_url())
            .json(&json!({
                "settings": {
                    "number_of_shards": 1,
                    "number_of_replicas": 0
                },
                "mappings": {
                    "properties": {
                        "stored_name": {"type": "keyword"},
                        "original_name": {"type": "text"},
                        "content_hash": {"type": "keyword"},
                        "author": {"type": "keyword"},
                        "byte_size": {"type": "long"},
                        "tags": {"type": "keyword"},
                        "uploaded_at": {"type": "date"},
                        "uploaded_by": {"type": "keyword"},
                        "storage_path": {"type": "keyword"},
                        "pages": {
                            "type": "nested",
                            "properties": {
                                "page_number": {"type": "integer"},
                                "text": {"type": "text", "analyzer": "french"}
                            }
                        }
                    }
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Request(format!(
                "index setup failed with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentIndex for ElasticIndex {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        let response = self.client.head(self.index_url()).send().await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if !response.status().is_client_error() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        self.create_index().await
    }

    async fn find_duplicate(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<String>, SearchError> {
        let body = json!({
            "size": 1,
            "_source": false,
            "query": {
                "bool": {
                    "filter": [
                        {"term": {"content_hash": fingerprint.content_hash}},
                        {"term": {"author": fingerprint.author}},
                        {"term": {"byte_size": fingerprint.byte_size}}
                    ]
                }
            }
        });

        let response = self.search(&body).await?;
        Ok(response
            .pointer("/hits/hits/0/_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn index_document(&self, document: &PdfDocument) -> Result<String, SearchError> {
        // refresh=true makes the write visible to the very next search,
        // which the post-upload search contract depends on.
        let response = self
            .client
            .post(format!("{}/_doc?refresh=true", self.index_url()))
            .json(document)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: Value = response.json().await?;
        payload
            .pointer("/_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: "index write response carried no _id".to_string(),
            })
    }

    async fn search(&self, body: &Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }

    async fn get_document(&self, id: &str) -> Result<Option<PdfDocument>, SearchError> {
        let response = self
            .client
            .get(format!("{}/_doc/{}", self.index_url(), id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: Value = response.json().await?;
        let source = match payload.pointer("/_source") {
            Some(source) => source.clone(),
            None => return Ok(None),
        };

        let mut document: PdfDocument = serde_json::from_value(source)?;
        document.id = Some(id.to_string());
        Ok(Some(document))
    }

    async fn reset(&self) -> Result<(), SearchError> {
        let response = self.client.delete(self.index_url()).send().await?;

        // A missing index is already the state we want.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        self.create_index().await
    }

    async fn count(&self) -> Result<u64, SearchError> {
        let response = self
            .client
            .get(format!("{}/_count", self.index_url()))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "elasticsearch".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: Value = response.json().await?;
        Ok(payload
            .pointer("/count")
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }
}
