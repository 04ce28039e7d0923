//! Primary/Fallback Provider Chain
//!
//! Cascading provider attempts:
//!
//! 1. Try the provider; retry recoverable failures with exponential backoff
//!    and jitter (via `backon`)
//! 2. On a non-recoverable failure, classify it; move on to the next provider
//!    when the category allows fallback
//! 3. Stop at the first success, a bad request, or when every provider failed

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::constants::chain as chain_constants;

use super::{LlmProvider, LlmResponse, SharedProvider};
use crate::types::{ErrorClassifier, Result, RiskError};

/// Provider with routing metadata
#[derive(Clone)]
pub struct ChainedProvider {
    pub provider: SharedProvider,
    /// Lower is tried first
    pub priority: u8,
    /// Retries on the same provider before falling back
    pub max_retries: usize,
}

impl ChainedProvider {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            priority: 100,
            max_retries: chain_constants::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// First retry delay
    pub base_delay: Duration,
    /// Cap on any single retry delay
    pub max_delay: Duration,
    pub backoff_factor: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(chain_constants::MAX_DELAY_SECS),
            backoff_factor: 2.0,
        }
    }
}

impl ChainConfig {
    fn backoff(&self, max_retries: usize) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_factor)
            .with_max_times(max_retries)
            .with_jitter()
    }
}

/// Execution statistics for one chain call
#[derive(Debug, Default)]
pub struct ChainStats {
    pub total_attempts: usize,
    pub successful_provider: Option<String>,
    /// `provider: error` for every provider that gave up
    pub failures: Vec<String>,
}

pub struct ProviderChain {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            providers: Vec::new(),
            config,
        }
    }

    pub fn add_provider(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.priority);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run the prompt through the chain
    #[instrument(skip(self, prompt, schema), fields(providers = self.providers.len()))]
    pub async fn execute(&self, prompt: &str, schema: &Value) -> Result<(LlmResponse, ChainStats)> {
        let mut stats = ChainStats::default();

        if self.providers.is_empty() {
            return Err(RiskError::Config(
                "No providers configured in chain".to_string(),
            ));
        }

        let mut last_error = None;

        for chained in &self.providers {
            let provider = &chained.provider;
            let name = provider.name().to_string();
            let mut attempts = 0usize;

            let result = (|| {
                attempts += 1;
                provider.generate(prompt, schema)
            })
            .retry(self.config.backoff(chained.max_retries))
            .sleep(tokio::time::sleep)
            .when(RiskError::is_recoverable)
            .notify(|e: &RiskError, delay: Duration| {
                warn!("{} failed ({}), retrying in {:?}", name, e, delay);
            })
            .await;

            stats.total_attempts += attempts;

            match result {
                Ok(response) => {
                    info!("{} succeeded after {} attempt(s)", name, attempts);
                    stats.successful_provider = Some(name);
                    return Ok((response, stats));
                }
                Err(e) => {
                    let classified = ErrorClassifier::classify_error(&e, &name);
                    stats.failures.push(format!("{}: {}", name, e));

                    if !classified.category.should_fallback() {
                        warn!("{} rejected the request ({}), not falling back", name, classified);
                        return Err(e);
                    }

                    warn!("{} gave up ({}), trying next provider", name, classified.category);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            RiskError::LlmApi("All providers in chain failed".to_string())
        }))
    }
}

#[async_trait]
impl LlmProvider for ProviderChain {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let (response, _stats) = self.execute(prompt, schema).await?;
        Ok(response)
    }

    fn name(&self) -> &str {
        "provider-chain"
    }

    fn model(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider.model())
            .unwrap_or("unknown")
    }

    async fn health_check(&self) -> Result<bool> {
        for chained in &self.providers {
            if chained.provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Builder for creating provider chains
pub struct ProviderChainBuilder {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
    max_retries: usize,
}

impl ProviderChainBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: ChainConfig::default(),
            max_retries: chain_constants::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Retries applied to providers added after this call
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn add_provider(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a shared provider; insertion order decides priority
    pub fn add_shared(mut self, provider: SharedProvider) -> Self {
        let priority = self.providers.len().min(u8::MAX as usize) as u8;
        self.providers.push(
            ChainedProvider::new(provider)
                .with_priority(priority)
                .with_max_retries(self.max_retries),
        );
        self
    }

    pub fn build(self) -> ProviderChain {
        self.providers
            .into_iter()
            .fold(ProviderChain::new(self.config), |chain, p| {
                chain.add_provider(p)
            })
    }
}

impl Default for ProviderChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience for wrapping a single provider
pub fn single(provider: SharedProvider) -> ProviderChain {
    ProviderChainBuilder::new().add_shared(Arc::clone(&provider)).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockProvider {
        name: String,
        fail_count: AtomicU32,
        max_failures: u32,
        error_message: String,
    }

    impl MockProvider {
        fn new(name: &str, max_failures: u32, error_message: &str) -> Self {
            Self {
                name: name.to_string(),
                fail_count: AtomicU32::new(0),
                max_failures,
                error_message: error_message.to_string(),
            }
        }

        fn calls(&self) -> u32 {
            self.fail_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            let count = self.fail_count.fetch_add(1, Ordering::SeqCst);
            if count < self.max_failures {
                Err(RiskError::LlmApi(self.error_message.clone()))
            } else {
                Ok(LlmResponse::content_only(Value::String(format!(
                    "answer from {}",
                    self.name
                ))))
            }
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn fast_config() -> ChainConfig {
        ChainConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
        }
    }

    #[tokio::test]
    async fn test_first_provider_succeeds() {
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .add_shared(Arc::new(MockProvider::new("primary", 0, "")))
            .build();

        let (response, stats) = chain.execute("test", &Value::Null).await.unwrap();
        assert_eq!(response.text(), "answer from primary");
        assert_eq!(stats.successful_provider, Some("primary".to_string()));
        assert_eq!(stats.total_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let primary = Arc::new(MockProvider::new("primary", 2, "Failed to connect to Ollama"));
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .with_max_retries(3)
            .add_shared(primary.clone())
            .build();

        let (_, stats) = chain.execute("test", &Value::Null).await.unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(primary.calls(), 3);
    }

    #[tokio::test]
    async fn test_fallback_on_auth_error() {
        let primary = Arc::new(MockProvider::new("primary", 100, "401 unauthorized"));
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .add_shared(primary.clone())
            .add_shared(Arc::new(MockProvider::new("fallback", 0, "")))
            .build();

        let (response, stats) = chain.execute("test", &Value::Null).await.unwrap();
        assert_eq!(response.text(), "answer from fallback");
        // auth errors are not retried on the same provider
        assert_eq!(primary.calls(), 1);
        assert_eq!(stats.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_after_exhausted_retries() {
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .with_max_retries(1)
            .add_shared(Arc::new(MockProvider::new("primary", 100, "connection refused")))
            .add_shared(Arc::new(MockProvider::new("fallback", 0, "")))
            .build();

        let (_, stats) = chain.execute("test", &Value::Null).await.unwrap();
        assert_eq!(stats.successful_provider, Some("fallback".to_string()));
        assert_eq!(stats.total_attempts, 3);
    }

    #[tokio::test]
    async fn test_bad_request_stops_chain() {
        let fallback = Arc::new(MockProvider::new("fallback", 0, ""));
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .add_shared(Arc::new(MockProvider::new("primary", 100, "400 bad request")))
            .add_shared(fallback.clone())
            .build();

        assert!(chain.execute("test", &Value::Null).await.is_err());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .with_max_retries(0)
            .add_shared(Arc::new(MockProvider::new("a", 100, "503 overloaded")))
            .add_shared(Arc::new(MockProvider::new("b", 100, "503 overloaded")))
            .build();

        let err = chain.execute("test", &Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    struct SlowThenOk(AtomicU32);

    #[async_trait]
    impl LlmProvider for SlowThenOk {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RiskError::timeout("generate", Duration::from_millis(1)))
            } else {
                Ok(LlmResponse::content_only(Value::String("late answer".to_string())))
            }
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_timeout_is_retried_on_same_provider() {
        let slow = Arc::new(SlowThenOk(AtomicU32::new(0)));
        let chain = ProviderChainBuilder::new()
            .with_config(fast_config())
            .with_max_retries(2)
            .add_shared(slow.clone())
            .build();

        let (response, stats) = chain.execute("test", &Value::Null).await.unwrap();
        assert_eq!(response.text(), "late answer");
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(slow.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = ProviderChain::new(fast_config());
        assert!(chain.is_empty());
        assert!(chain.execute("test", &Value::Null).await.is_err());
    }

    #[tokio::test]
    async fn test_chain_as_provider() {
        let chain = single(Arc::new(MockProvider::new("solo", 0, "")));
        assert_eq!(chain.name(), "provider-chain");
        assert_eq!(chain.model(), "mock-model");
        assert!(chain.health_check().await.unwrap());
    }
}
