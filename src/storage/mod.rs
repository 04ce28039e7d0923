pub mod cache;
pub mod chat_history;
pub mod database;
pub mod pinecone;
pub mod repository;
pub mod vector_store;

pub use cache::TtlCache;
pub use chat_history::ChatHistory;
pub use database::{Database, PoolConfig, SharedDatabase};
pub use pinecone::PineconeStore;
pub use repository::{RiskRepository, SeedSummary};
pub use vector_store::{
    DisabledStore, Metadata, QueryMatch, SharedVectorStore, SqliteVectorStore, StoredDocument,
    VectorRecord, VectorStore, cosine_similarity, filter_of,
};

use std::sync::Arc;

use tracing::info;

use crate::config::{Config, VectorBackend};
use crate::types::Result;

/// Open the configured vector store backend
pub fn open_vector_store(config: &Config) -> Result<SharedVectorStore> {
    let store: SharedVectorStore = match config.vector_db.backend {
        VectorBackend::Sqlite => {
            let db = Arc::new(Database::open(&config.vector_db.path)?);
            Arc::new(SqliteVectorStore::new(db)?)
        }
        VectorBackend::Pinecone => Arc::new(PineconeStore::new(
            &config.vector_db.pinecone,
            config.embedding.dimensions,
        )?),
        VectorBackend::None => Arc::new(DisabledStore),
    };
    info!("Vector store backend: {}", store.name());
    Ok(store)
}
