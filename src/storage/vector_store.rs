//! Vector Store Abstraction
//!
//! Collections of text documents with embeddings and flat JSON metadata.
//! Backends:
//! - `SqliteVectorStore`: local file, cosine similarity computed in process
//! - `PineconeStore`: hosted index over REST (see `pinecone.rs`)
//! - `DisabledStore`: no-op, used when the backend is `none`

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

use super::database::SharedDatabase;
use crate::constants::vector::MAX_FILTER_RESULTS;
use crate::types::{Result, ResultExt, RiskError, log_filter_warn};

/// Flat key/value metadata stored next to each document
pub type Metadata = Map<String, Value>;

/// Document to insert or replace
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// Document as read back from a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
}

/// Similarity query hit; higher score is closer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    #[serde(flatten)]
    pub doc: StoredDocument,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// False for the disabled backend; callers fall back to unfiltered lists
    fn is_enabled(&self) -> bool {
        true
    }

    /// Insert or replace by id
    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()>;

    /// Nearest documents to `embedding`, restricted to metadata equal to `filter`
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Metadata>,
        limit: usize,
    ) -> Result<Vec<QueryMatch>>;

    /// Documents by id, in the order found
    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>>;

    /// Documents whose metadata matches `filter`; an empty filter returns all
    async fn get_where(
        &self,
        collection: &str,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<StoredDocument>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

pub type SharedVectorStore = Arc<dyn VectorStore>;

// =============================================================================
// Helpers
// =============================================================================

/// Cosine similarity; zero vectors and length mismatches score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Equality match on every filter key
pub fn metadata_matches(metadata: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Build a metadata filter from key/value pairs
pub fn filter_of<I, K>(pairs: I) -> Metadata
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

// =============================================================================
// SQLite Backend
// =============================================================================

pub struct SqliteVectorStore {
    db: SharedDatabase,
}

type DocumentRow = (String, String, String, Vec<u8>);

impl SqliteVectorStore {
    pub fn new(db: SharedDatabase) -> Result<Self> {
        db.initialize()?;
        Ok(Self { db })
    }

    fn parse_metadata(id: &str, raw: &str) -> Metadata {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!("Corrupted metadata for document '{}', ignoring", id);
                Map::new()
            }
        }
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<DocumentRow>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, document, metadata, embedding
                 FROM documents
                 WHERE collection = ?1
                 ORDER BY updated_at DESC, id",
            )
            .with_context("Failed to prepare collection scan")?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .filter_map(|r| log_filter_warn(r, "Skipping unreadable document row"))
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<()> {
        let count = records.len();
        let collection = collection.to_string();
        self.db.transaction(move |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO documents (collection, id, document, metadata, embedding, dimensions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding,
                    dimensions = excluded.dimensions,
                    updated_at = CURRENT_TIMESTAMP",
            )?;
            for record in &records {
                let metadata = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    collection,
                    record.id,
                    record.document,
                    metadata,
                    encode_embedding(&record.embedding),
                    record.embedding.len() as i64,
                ])?;
            }
            Ok(())
        })?;

        tracing::debug!("Upserted {} documents", count);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        filter: Option<&Metadata>,
        limit: usize,
    ) -> Result<Vec<QueryMatch>> {
        let mut matches: Vec<QueryMatch> = self
            .load_collection(collection)?
            .into_iter()
            .filter_map(|(id, document, raw_meta, blob)| {
                let metadata = Self::parse_metadata(&id, &raw_meta);
                if let Some(f) = filter
                    && !metadata_matches(&metadata, f)
                {
                    return None;
                }
                let score = cosine_similarity(embedding, &decode_embedding(&blob));
                Some(QueryMatch {
                    doc: StoredDocument {
                        id,
                        document,
                        metadata,
                    },
                    score,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<StoredDocument>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT document, metadata FROM documents WHERE collection = ?1 AND id = ?2",
            )
            .with_context("Failed to prepare document lookup")?;

        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            let row: Option<(String, String)> = stmt
                .query_row(params![collection, id], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?;
            if let Some((document, raw_meta)) = row {
                docs.push(StoredDocument {
                    id: id.clone(),
                    document,
                    metadata: Self::parse_metadata(id, &raw_meta),
                });
            }
        }
        Ok(docs)
    }

    async fn get_where(
        &self,
        collection: &str,
        filter: &Metadata,
        limit: usize,
    ) -> Result<Vec<StoredDocument>> {
        Ok(self
            .load_collection(collection)?
            .into_iter()
            .map(|(id, document, raw_meta, _)| {
                let metadata = Self::parse_metadata(&id, &raw_meta);
                StoredDocument {
                    id,
                    document,
                    metadata,
                }
            })
            .filter(|doc| metadata_matches(&doc.metadata, filter))
            .take(limit.min(MAX_FILTER_RESULTS))
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.db.connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )
            .with_context("Failed to count documents")?;
        Ok(count as usize)
    }
}

// =============================================================================
// Disabled Backend
// =============================================================================

/// Backend `none`: writes are dropped, reads are empty.
#[derive(Debug, Default)]
pub struct DisabledStore;

#[async_trait]
impl VectorStore for DisabledStore {
    fn name(&self) -> &str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn upsert(&self, _collection: &str, _records: Vec<VectorRecord>) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _filter: Option<&Metadata>,
        _limit: usize,
    ) -> Result<Vec<QueryMatch>> {
        Ok(Vec::new())
    }

    async fn get(&self, _collection: &str, _ids: &[String]) -> Result<Vec<StoredDocument>> {
        Ok(Vec::new())
    }

    async fn get_where(
        &self,
        _collection: &str,
        _filter: &Metadata,
        _limit: usize,
    ) -> Result<Vec<StoredDocument>> {
        Ok(Vec::new())
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Reject an embedding whose width disagrees with the store
pub fn check_dimensions(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RiskError::VectorStore(format!(
            "Embedding has {} dimensions, expected {}",
            embedding.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;

    fn store() -> SqliteVectorStore {
        let db = Arc::new(Database::open_in_memory().unwrap());
        SqliteVectorStore::new(db).unwrap()
    }

    fn record(id: &str, project: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            document: format!("Risk {id}"),
            metadata: filter_of([("project_id", json!(project)), ("name", json!(id))]),
            embedding,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)), v);
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity_with_filter() {
        let store = store();
        store
            .upsert(
                "risks",
                vec![
                    record("r1", "p1", vec![1.0, 0.0, 0.0]),
                    record("r2", "p1", vec![0.7, 0.7, 0.0]),
                    record("r3", "p2", vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let all = store.query("risks", &[1.0, 0.0, 0.0], None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].score >= all[2].score);

        let filter = filter_of([("project_id", json!("p1"))]);
        let scoped = store
            .query("risks", &[1.0, 0.0, 0.0], Some(&filter), 10)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 2);
        assert_eq!(scoped[0].doc.id, "r1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_counts() {
        let store = store();
        store
            .upsert("risks", vec![record("r1", "p1", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("risks", vec![record("r1", "p9", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("risks").await.unwrap(), 1);
        assert_eq!(store.count("projects").await.unwrap(), 0);

        let docs = store.get("risks", &["r1".to_string(), "missing".to_string()]).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata["project_id"], json!("p9"));
    }

    #[tokio::test]
    async fn test_get_where() {
        let store = store();
        store
            .upsert(
                "risks",
                vec![record("r1", "p1", vec![1.0]), record("r2", "p2", vec![1.0])],
            )
            .await
            .unwrap();

        let p2 = store
            .get_where("risks", &filter_of([("project_id", json!("p2"))]), 10)
            .await
            .unwrap();
        assert_eq!(p2.len(), 1);
        assert_eq!(p2[0].id, "r2");

        let all = store.get_where("risks", &Metadata::new(), 10).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_store() {
        let store = DisabledStore;
        assert!(!store.is_enabled());
        store.upsert("risks", vec![record("r1", "p1", vec![1.0])]).await.unwrap();
        assert_eq!(store.count("risks").await.unwrap(), 0);
        assert!(store.query("risks", &[1.0], None, 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(3, &[0.0; 3]).is_ok());
        assert!(check_dimensions(3, &[0.0; 2]).is_err());
    }
}
