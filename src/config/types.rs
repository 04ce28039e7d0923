//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/riskwatch/) and project (.riskwatch/) level configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::constants::{chat, dashboard, data, llm, risk, vector};
use crate::types::{Result, RiskError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub app: AppConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_db: VectorDbConfig,
    pub risk: RiskConfig,
    pub chat: ChatConfig,
    pub dashboard: DashboardConfig,
    pub data: DataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            app: AppConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_db: VectorDbConfig::default(),
            risk: RiskConfig::default(),
            chat: ChatConfig::default(),
            dashboard: DashboardConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RiskError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(RiskError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(RiskError::Config(
                "Embedding dimensions must be greater than 0".to_string(),
            ));
        }

        if self.chat.max_history == 0 {
            return Err(RiskError::Config(
                "Chat max_history must be greater than 0".to_string(),
            ));
        }

        let t = &self.risk.thresholds;
        if !(t.low < t.medium && t.medium < t.high && t.high <= risk::MAX_SCORE) {
            return Err(RiskError::Config(format!(
                "Risk thresholds must be strictly ascending and at most {}: low={}, medium={}, high={}",
                risk::MAX_SCORE,
                t.low,
                t.medium,
                t.high
            )));
        }

        if let Some((category, weight)) = self
            .risk
            .category_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(RiskError::Config(format!(
                "Weight for category '{}' must be a non-negative number, got {}",
                category, weight
            )));
        }

        if self.data.refresh_interval_secs == 0 {
            return Err(RiskError::Config(
                "Data refresh_interval_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Application
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub debug: bool,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Directory for the vector store, chat history and caches
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "RiskWatch".to_string(),
            debug: false,
            log_level: "info".to_string(),
            data_dir: PathBuf::from(".riskwatch"),
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai" or "none"
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub max_retries: usize,
    pub api_base: Option<String>,
    /// Never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Secondary provider tried when the primary fails
    pub fallback_provider: Option<String>,
    pub fallback_model: Option<String>,
    /// Per-agent model overrides keyed by agent id (e.g. "reporting_agent")
    pub agent_models: BTreeMap<String, String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("fallback_provider", &self.fallback_provider)
            .field("fallback_model", &self.fallback_model)
            .field("agent_models", &self.agent_models)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: llm::DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: llm::AGENT_TEMPERATURE,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            max_retries: crate::constants::chain::DEFAULT_MAX_RETRIES,
            api_base: None,
            api_key: None,
            fallback_provider: None,
            fallback_model: None,
            agent_models: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self.provider.as_str(), "" | "none")
    }

    /// Model for an agent, falling back to the default model
    pub fn model_for(&self, agent_id: &str) -> &str {
        self.agent_models
            .get(agent_id)
            .map(String::as_str)
            .unwrap_or(&self.model)
    }
}

// =============================================================================
// Embeddings
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local feature hashing; no network access
    #[default]
    Hashing,
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: Option<String>,
    pub dimensions: usize,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            model: None,
            dimensions: vector::DEFAULT_EMBEDDING_DIMENSIONS,
            api_base: None,
            timeout_secs: 30,
        }
    }
}

// =============================================================================
// Vector Database
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Embedded SQLite store
    #[default]
    #[serde(alias = "chromadb", alias = "local")]
    Sqlite,
    Pinecone,
    None,
}

impl std::str::FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "chromadb" | "local" => Ok(VectorBackend::Sqlite),
            "pinecone" => Ok(VectorBackend::Pinecone),
            "none" | "" => Ok(VectorBackend::None),
            other => Err(format!(
                "Unknown vector backend: {}. Valid values: sqlite, pinecone, none",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    pub backend: VectorBackend,
    /// SQLite database file (relative paths resolve against the working directory)
    pub path: PathBuf,
    pub pinecone: PineconeConfig,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Sqlite,
            path: PathBuf::from(".riskwatch/vectors.db"),
            pinecone: PineconeConfig::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub environment: String,
    pub index_name: String,
    /// Full index host; derived from environment when absent
    pub host: Option<String>,
}

impl std::fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("index_name", &self.index_name)
            .field("host", &self.host)
            .finish()
    }
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: "us-west1-gcp".to_string(),
            index_name: "project-risks".to_string(),
            host: None,
        }
    }
}

// =============================================================================
// Risk Scoring
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low: risk::LOW_THRESHOLD,
            medium: risk::MEDIUM_THRESHOLD,
            high: risk::HIGH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub thresholds: ThresholdConfig,
    /// Percent weight per category name
    pub category_weights: BTreeMap<String, f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            category_weights: risk::CATEGORY_WEIGHTS
                .iter()
                .map(|(c, w)| (c.to_string(), *w))
                .collect(),
        }
    }
}

// =============================================================================
// Chat, Dashboard, Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub history_path: PathBuf,
    pub max_history: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(".riskwatch").join(chat::HISTORY_FILE),
            max_history: chat::MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    pub port: u16,
    pub default_days_back: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: dashboard::DEFAULT_BIND.to_string(),
            port: dashboard::DEFAULT_PORT,
            default_days_back: data::DEFAULT_DAYS_BACK,
        }
    }
}

impl DashboardConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Mock snapshot cache lifetime
    pub refresh_interval_secs: u64,
    /// Fixed RNG seed for reproducible mock data
    pub seed: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: data::REFRESH_INTERVAL_SECS,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.chat.max_history, 50);
        assert_eq!(config.risk.category_weights.len(), 12);
    }

    #[test]
    fn test_default_weights_sum_to_100() {
        let total: f64 = RiskConfig::default().category_weights.values().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = Config::default();
        config.risk.thresholds = ThresholdConfig {
            low: 50,
            medium: 40,
            high: 75,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = Config::default();
        config
            .risk
            .category_weights
            .insert("Security".to_string(), -1.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Security"));
    }

    #[test]
    fn test_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_agent_model_override() {
        let mut llm = LlmConfig::default();
        llm.agent_models
            .insert("reporting_agent".to_string(), "llama3:70b".to_string());
        assert_eq!(llm.model_for("reporting_agent"), "llama3:70b");
        assert_eq!(llm.model_for("risk_scorer"), "llama3");
    }

    #[test]
    fn test_vector_backend_parse() {
        assert_eq!("chromadb".parse::<VectorBackend>(), Ok(VectorBackend::Sqlite));
        assert_eq!("Pinecone".parse::<VectorBackend>(), Ok(VectorBackend::Pinecone));
        assert!("redis".parse::<VectorBackend>().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let out = toml::to_string(&config).unwrap();
        assert!(!out.contains("sk-secret"));
        assert!(!format!("{:?}", config.llm).contains("sk-secret"));
    }
}
