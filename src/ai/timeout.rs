//! Timeouts for agent runs and outbound calls
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::from_llm(&llm_config);
//! let answer = with_timeout(config.crew_run, crew.run(query, project), "crew run").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::constants::network as net_constants;
use crate::types::{Result, RiskError};

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Single model call
    pub llm_request: Duration,
    /// Embedding request
    pub embedding: Duration,
    /// Full crew run (all tasks in sequence)
    pub crew_run: Duration,
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from_secs(net_constants::DEFAULT_TIMEOUT_SECS)
    }
}

impl TimeoutConfig {
    fn from_secs(llm_secs: u64) -> Self {
        Self {
            llm_request: Duration::from_secs(llm_secs),
            embedding: Duration::from_secs(30),
            // five sequential tasks, each allowed one full request
            crew_run: Duration::from_secs(llm_secs.saturating_mul(5)),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }

    pub fn from_llm(config: &LlmConfig) -> Self {
        Self::from_secs(config.timeout_secs)
    }
}

/// Run an async operation with a deadline
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(RiskError::timeout(operation_name, timeout)),
    }
}

/// Variant for futures that cannot fail on their own
pub async fn with_timeout_map<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| RiskError::timeout(operation_name, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_network_constants() {
        let config = TimeoutConfig::default();
        assert_eq!(config.llm_request.as_secs(), net_constants::DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.crew_run, config.llm_request * 5);
    }

    #[test]
    fn test_from_llm_config() {
        let llm = LlmConfig {
            timeout_secs: 30,
            ..Default::default()
        };
        let config = TimeoutConfig::from_llm(&llm);
        assert_eq!(config.llm_request.as_secs(), 30);
        assert_eq!(config.crew_run.as_secs(), 150);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, RiskError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, RiskError>(42)
            },
            "crew run",
        )
        .await;
        assert!(matches!(result.unwrap_err(), RiskError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_with_timeout_map() {
        let value = with_timeout_map(Duration::from_secs(1), async { "done" }, "noop")
            .await
            .unwrap();
        assert_eq!(value, "done");
    }
}
