//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait used by the agent crew.
//! Providers return `LlmResponse` carrying the raw completion text, the parsed
//! content, and token usage.
//!
//! ## Modules
//!
//! - `chain`: Primary/fallback chain with exponential backoff retries

mod chain;
mod ollama;
mod openai;
mod prompt_utils;

pub use chain::{ChainConfig, ChainedProvider, ProviderChain, ProviderChainBuilder};
pub use ollama::{OllamaProvider, validate_endpoint};
pub use openai::OpenAiProvider;
pub use prompt_utils::{build_schema_prompt, schema_instructions};

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::ai::validation::extract_json_from_response;
use crate::config::LlmConfig;
use crate::types::{Result, RiskError};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Parsed JSON when a schema was requested, otherwise the text as a string value
    pub content: Value,
    /// Completion text exactly as returned
    pub raw: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: Value) -> Self {
        let raw = match &content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            content,
            raw,
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata::default(),
        }
    }

    /// Build from completion text, parsing JSON only when a schema was given.
    pub fn from_completion(
        raw: String,
        schema: &Value,
        usage: TokenUsage,
        timing: ResponseTiming,
        metadata: ResponseMetadata,
    ) -> Result<Self> {
        let content = if schema.is_null() {
            Value::String(raw.clone())
        } else {
            extract_json_from_response(&raw).map_err(|e| RiskError::LlmParse {
                message: e.to_string(),
                raw_output: raw.clone(),
            })?
        };
        Ok(Self {
            content,
            raw,
            usage,
            timing,
            metadata,
        })
    }

    /// Text view of the content
    pub fn text(&self) -> &str {
        match &self.content {
            Value::String(s) => s,
            _ => &self.raw,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Wall clock milliseconds
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across agents.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Per-provider settings derived from `LlmConfig`.
///
/// API keys are never serialized and are redacted in debug output; providers
/// convert them to `SecretString` internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "ollama" or "openai"
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        LlmConfig::default().provider_config(None)
    }
}

impl LlmConfig {
    /// Primary provider settings, optionally with a model override
    pub fn provider_config(&self, model: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider.clone(),
            model: Some(model.unwrap_or(&self.model).to_string()),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_tokens: self.max_tokens,
        }
    }

    /// Fallback provider settings, when one is configured
    pub fn fallback_config(&self) -> Option<ProviderConfig> {
        let provider = self.fallback_provider.clone()?;
        // api_base is provider specific; never share it across providers
        let api_base = (provider == self.provider)
            .then(|| self.api_base.clone())
            .flatten();
        Some(ProviderConfig {
            model: self.fallback_model.clone(),
            api_base,
            provider,
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            max_tokens: self.max_tokens,
        })
    }
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion.
    ///
    /// With a null `schema` the completion is returned as text; otherwise the
    /// provider asks for JSON and parses it, failing with `LlmParse` (which
    /// keeps the raw output) when the text cannot be repaired.
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(RiskError::Config(format!(
            "Unknown provider: {}. Supported: ollama, openai",
            config.provider
        ))),
    }
}

/// Provider for an agent: its model override on the primary, plus the
/// configured fallback. `None` when the LLM is disabled.
pub fn create_agent_provider(config: &LlmConfig, agent_id: &str) -> Result<Option<SharedProvider>> {
    if !config.is_enabled() {
        return Ok(None);
    }

    let primary = create_provider(&config.provider_config(Some(config.model_for(agent_id))))?;
    let Some(fallback) = config.fallback_config() else {
        return Ok(Some(primary));
    };

    let chain = ProviderChainBuilder::new()
        .with_max_retries(config.max_retries)
        .add_shared(primary)
        .add_shared(create_provider(&fallback)?)
        .build();
    Ok(Some(Arc::new(chain)))
}
