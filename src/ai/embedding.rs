//! Text Embeddings
//!
//! `Embedder` turns document text into fixed-size vectors for the vector
//! store. Remote embedders (Ollama, OpenAI) fall back to a zero vector on
//! failure so that storage and search keep working without a model.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::provider::validate_endpoint;
use crate::config::{EmbeddingConfig, EmbeddingProviderKind, LlmConfig};
use crate::constants::llm::{DEFAULT_OLLAMA_BASE, DEFAULT_OPENAI_EMBEDDING_MODEL};
use crate::types::{Result, RiskError};

pub type SharedEmbedder = Arc<dyn Embedder>;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Embed text, surfacing failures
    async fn try_embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed text; a zero vector when the embedder fails
    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_embed(text).await {
            Ok(v) => fit_dimensions(v, self.dimensions()),
            Err(e) => {
                warn!("{} embedding failed, using zero vector: {}", self.name(), e);
                vec![0.0; self.dimensions()]
            }
        }
    }
}

/// Pad with zeros or truncate so every vector in a collection has equal length
pub fn fit_dimensions(mut v: Vec<f32>, dimensions: usize) -> Vec<f32> {
    v.resize(dimensions, 0.0);
    v
}

// =============================================================================
// Hashing
// =============================================================================

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("static token pattern"));

/// Local feature-hashing embedder.
///
/// Each lowercase token and adjacent token pair is hashed into a signed
/// bucket; the result is L2-normalised. Deterministic and offline, so texts
/// sharing vocabulary land close together under cosine similarity.
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut idx_bytes = [0u8; 8];
        idx_bytes.copy_from_slice(&digest[..8]);
        let idx = (u64::from_le_bytes(idx_bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&lower).map(|m| m.as_str()).collect();

        for token in &tokens {
            self.add_feature(&mut v, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut v, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

// =============================================================================
// Ollama
// =============================================================================

pub struct OllamaEmbedder {
    api_base: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(api_base: &str, model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RiskError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_base: validate_endpoint(api_base)?,
            model: model.to_string(),
            dimensions,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.api_base))
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await?
            .error_for_status()?;

        let body: OllamaEmbeddingResponse = response.json().await?;
        debug!("Ollama embedding: {} dims", body.embedding.len());
        Ok(body.embedding)
    }
}

// =============================================================================
// OpenAI
// =============================================================================

pub struct OpenAiEmbedder {
    api_key: SecretString,
    api_base: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: Option<String>,
        api_base: Option<&str>,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                RiskError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RiskError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: api_base
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            dimensions,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({ "model": self.model, "input": text }))
            .send()
            .await?
            .error_for_status()?;

        let body: OpenAiEmbeddingResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RiskError::LlmApi("No embedding in OpenAI response".to_string()))
    }
}

/// Build the configured embedder.
///
/// Remote embedders inherit `api_base`/`api_key` from the LLM section when the
/// providers match. Construction failures fall back to hashing with a warning.
pub fn create_embedder(config: &EmbeddingConfig, llm: &LlmConfig) -> SharedEmbedder {
    let timeout = Duration::from_secs(config.timeout_secs);
    let shared_base = |provider: &str| {
        config
            .api_base
            .clone()
            .or_else(|| (llm.provider == provider).then(|| llm.api_base.clone()).flatten())
    };

    let built: Result<SharedEmbedder> = match config.provider {
        EmbeddingProviderKind::Hashing => return Arc::new(HashingEmbedder::new(config.dimensions)),
        EmbeddingProviderKind::Ollama => {
            let base = shared_base("ollama").unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string());
            let model = config.model.as_deref().unwrap_or("nomic-embed-text");
            OllamaEmbedder::new(&base, model, config.dimensions, timeout)
                .map(|e| Arc::new(e) as SharedEmbedder)
        }
        EmbeddingProviderKind::OpenAi => {
            let model = config
                .model
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_EMBEDDING_MODEL);
            OpenAiEmbedder::new(
                llm.api_key.clone(),
                shared_base("openai").as_deref(),
                model,
                config.dimensions,
                timeout,
            )
            .map(|e| Arc::new(e) as SharedEmbedder)
        }
    };

    built.unwrap_or_else(|e| {
        warn!("Embedding provider unavailable ({}), using hashing embedder", e);
        Arc::new(HashingEmbedder::new(config.dimensions))
    })
}
