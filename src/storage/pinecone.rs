//! Pinecone Vector Store
//!
//! Hosted backend over the Pinecone data-plane REST API. Collections map to
//! namespaces; the document text travels in the `document` metadata field.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::vector_store::{Metadata, QueryMatch, StoredDocument, VectorRecord, VectorStore};
use crate::config::PineconeConfig;
use crate::constants::network::DEFAULT_TIMEOUT_SECS;
use crate::types::{Result, RiskError};

const DOCUMENT_FIELD: &str = "document";

pub struct PineconeStore {
    api_key: SecretString,
    environment: String,
    index_name: String,
    configured_host: Option<String>,
    host: OnceCell<String>,
    dimensions: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for PineconeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeStore")
            .field("api_key", &"[REDACTED]")
            .field("environment", &self.environment)
            .field("index_name", &self.index_name)
            .field("host", &self.configured_host)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Deserialize)]
struct FetchedVector {
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
struct NamespaceStats {
    #[serde(default, rename = "vectorCount")]
    vector_count: usize,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    status: DescribeIndexStatus,
}

#[derive(Deserialize)]
struct DescribeIndexStatus {
    host: String,
}

impl PineconeStore {
    pub fn new(config: &PineconeConfig, dimensions: usize) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            RiskError::Config(
                "Pinecone API key not found. Set PINECONE_API_KEY or vector_db.pinecone.api_key"
                    .to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RiskError::VectorStore(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            environment: config.environment.clone(),
            index_name: config.index_name.clone(),
            configured_host: config.host.clone(),
            host: OnceCell::new(),
            dimensions,
            client,
        })
    }

    /// Data-plane base URL, looked up from the controller when not configured
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                if let Some(host) = &self.configured_host {
                    return Ok(normalize_host(host));
                }
                let url = format!(
                    "https://controller.{}.pinecone.io/databases/{}",
                    self.environment, self.index_name
                );
                let described: DescribeIndexResponse =
                    self.send(self.client.get(&url), "describe index").await?;
                info!("Resolved Pinecone index host: {}", described.status.host);
                Ok::<_, RiskError>(normalize_host(&described.status.host))
            })
            .await?;
        Ok(host.as_str())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        let response = request
            .header("Api-Key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| RiskError::VectorStore(format!("Pinecone {} failed: {}", operation, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RiskError::VectorStore(format!(
                "Pinecone {} error ({}): {}",
                operation, status, body
            )));
        }

        response.json().await.map_err(|e| {
            RiskError::VectorStore(format!("Failed to parse Pinecone {} response: {}", operation, e))
        })
    }

    /// Unit probe vector for filter-only lookups
    fn probe_vector(&self) -> Vec<f32> {
        let mut v = vec![0.0; self.dimensions.max(1)];
        v[0] = 1.0;
        v
    }
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// `{"k": v}` to Pinecone's `{"k": {"$eq": v}}`
pub fn to_pinecone_filter(filter: &Metadata) -> Value {
    Value::Object(
        filter
            .iter()
            .map(|(k, v)| (k.clone(), json!({ "$eq": v })))
            .collect(),
    )
}

/// Split stored metadata back into document text and the remaining fields
fn split_document(id: String, metadata: Option<Map<String, Value>>) -> StoredDocument {
    let mut metadata = metadata.unwrap_or_default();
    let document = match metadata.remove(DOCUMENT_FIELD) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    StoredDocument {
        id,
        document,
        metadata,
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        let host = self.host().await?;
        let vectors: Vec<UpsertVector<'_>> = records
            .iter()
            .map(|r| {
                let mut metadata = r.metadata.clone();
                metadata.insert(DOCUMENT_FIELD.to_string(), Value::String(r.document.clone()));
                UpsertVector {
                    id: &r.id,
                    values: &r.embedding,
                    metadata,
                }
            })
            .collect();

        let _: Value = self
            .send(
                self.client
                    .post(format!("{}/vectors/upsert", host))
                    .json(&json!({ "vectors": vectors, "namespace": collection })),
                "upsert",
            )
            .await?;

        debug!("Upserted {} vectors into namespace '{}'", records.len(), collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Metadata>,
        limit: usize,
    ) -> Result<Vec<QueryMatch>> {
        let host = self.host().await?;
        let mut body = json!({
            "vector": embedding,
            "topK": limit,
            "includeMetadata": true,
            "namespace": collection,
        });
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = to_pinecone_filter(f);
        }

        let response: QueryResponse = self
            .send(self.client.post(format!("{}/query", host)).json(&body), "query")
            .await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                score: m.score,
                doc: split_document(m.id, m.metadata),
            })
            .collect())
    }

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let host = self.host().await?;
        let mut query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        query.push(("namespace", collection));

        let mut response: FetchResponse = self
            .send(
                self.client
                    .get(format!("{}/vectors/fetch", host))
                    .query(&query),
                "fetch",
            )
            .await?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                response
                    .vectors
                    .remove(id)
                    .map(|v| split_document(id.clone(), v.metadata))
            })
            .collect())
    }

    async fn get_where(
        &self,
        collection: &str,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<StoredDocument>> {
        let probe = self.probe_vector();
        Ok(self
            .query(collection, &probe, Some(filter), limit)
            .await?
            .into_iter()
            .map(|m| m.doc)
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let host = self.host().await?;
        let stats: StatsResponse = self
            .send(
                self.client
                    .post(format!("{}/describe_index_stats", host))
                    .json(&json!({})),
                "describe_index_stats",
            )
            .await?;
        Ok(stats
            .namespaces
            .get(collection)
            .map(|n| n.vector_count)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let config = PineconeConfig::default();
        assert!(PineconeStore::new(&config, 8).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = PineconeConfig {
            api_key: Some("pc-secret".to_string()),
            ..Default::default()
        };
        let store = PineconeStore::new(&config, 8).unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("pc-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_filter_translation() {
        let mut filter = Metadata::new();
        filter.insert("project_id".to_string(), json!("p1001"));
        assert_eq!(
            to_pinecone_filter(&filter),
            json!({"project_id": {"$eq": "p1001"}})
        );
    }

    #[test]
    fn test_split_document() {
        let mut meta = Map::new();
        meta.insert("document".to_string(), json!("Risk: Budget Overrun"));
        meta.insert("category".to_string(), json!("Financial"));
        let doc = split_document("r2002".to_string(), Some(meta));
        assert_eq!(doc.document, "Risk: Budget Overrun");
        assert!(!doc.metadata.contains_key("document"));
        assert_eq!(doc.metadata["category"], json!("Financial"));
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("project-risks-abc.svc.us-west1-gcp.pinecone.io/"),
            "https://project-risks-abc.svc.us-west1-gcp.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }
}
