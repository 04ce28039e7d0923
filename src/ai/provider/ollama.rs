//! Ollama Local LLM Provider
//!
//! Provider for locally-running Ollama models. Token counts come from the
//! `prompt_eval_count`/`eval_count` fields Ollama reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
    prompt_utils,
};
use crate::constants::llm::{DEFAULT_OLLAMA_BASE, DEFAULT_OLLAMA_MODEL};
use crate::types::{Result, RiskError};

pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

/// Validate an endpoint URL (SSRF prevention).
///
/// Only http/https are accepted; non-localhost hosts are allowed with a warning.
/// The trailing slash is removed.
pub fn validate_endpoint(endpoint: &str) -> Result<String> {
    let url = url::Url::parse(endpoint)
        .map_err(|e| RiskError::Config(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RiskError::Config(format!(
            "Endpoint must use http or https scheme, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str()
        && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
    {
        warn!(
            "Endpoint is not localhost: {}. Ensure this is intentional.",
            host
        );
    }

    let mut result = url.to_string();
    if result.ends_with('/') {
        result.pop();
    }
    Ok(result)
}

impl OllamaProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string());
        let api_base = validate_endpoint(&api_base)?;

        let model = config
            .model
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RiskError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            prompt: prompt_utils::build_schema_prompt(prompt, schema),
            stream: false,
            options: Some(OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            }),
            // Free text answers must not be forced into JSON mode
            format: (!schema.is_null()).then(|| "json".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, temperature: {})",
            self.model, self.temperature
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt, schema);
        let url = format!("{}/api/generate", self.api_base);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RiskError::LlmApi(format!(
                        "Failed to connect to Ollama at {}. Is Ollama running? Start with: ollama serve",
                        self.api_base
                    ))
                } else if e.is_timeout() {
                    RiskError::LlmApi(format!("Ollama request timed out: {}", e))
                } else {
                    RiskError::LlmApi(format!("Ollama request failed: {}", e))
                }
            })?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RiskError::LlmApi(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| RiskError::LlmApi(format!("Failed to parse Ollama response: {}", e)))?;

        let usage = TokenUsage::from_ollama(
            body.prompt_eval_count.unwrap_or(0),
            body.eval_count.unwrap_or(0),
        );
        debug!(
            "Ollama responded in {}ms ({} tokens)",
            elapsed.as_millis(),
            usage.total()
        );

        LlmResponse::from_completion(
            body.response,
            schema,
            usage,
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: "ollama".to_string(),
            },
        )
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.api_base);

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let Ok(tags) = resp.json::<OllamaTagsResponse>().await else {
                    info!("Ollama is available");
                    return Ok(true);
                };

                let wanted = self.model.trim_end_matches(":latest");
                let model_available = tags
                    .models
                    .iter()
                    .any(|m| m.name == self.model || m.name.starts_with(wanted));

                if model_available {
                    info!("Ollama is available with model: {}", self.model);
                    Ok(true)
                } else {
                    warn!(
                        "Ollama is running but model '{}' not found. Pull with: ollama pull {}",
                        self.model, self.model
                    );
                    Ok(false)
                }
            }
            Ok(resp) => {
                warn!("Ollama API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Ollama not available: {}. Start with: ollama serve", e);
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let provider = OllamaProvider::new(ProviderConfig {
            provider: "ollama".to_string(),
            model: None,
            ..Default::default()
        })
        .expect("Failed to create provider");
        assert_eq!(provider.api_base, DEFAULT_OLLAMA_BASE);
        assert_eq!(provider.model, DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn test_validate_endpoint() {
        assert_eq!(
            validate_endpoint("http://localhost:11434/").unwrap(),
            "http://localhost:11434"
        );
        assert!(validate_endpoint("file:///etc/passwd").is_err());
        assert!(validate_endpoint("not a url").is_err());
        // Remote hosts are allowed, only warned about
        assert!(validate_endpoint("https://gpu-box.internal:11434").is_ok());
    }

    #[test]
    fn test_text_requests_skip_json_format() {
        let provider = OllamaProvider::new(ProviderConfig::default()).unwrap();

        let text = provider.build_request("What is the budget status?", &Value::Null);
        assert!(text.format.is_none());
        assert_eq!(text.prompt, "What is the budget status?");

        let structured = provider.build_request("List risks", &json!({"type": "object"}));
        assert_eq!(structured.format.as_deref(), Some("json"));
        assert!(structured.prompt.contains("Respond ONLY with valid JSON"));
    }

    #[test]
    fn test_response_deserializes_without_counts() {
        let body: OllamaResponse =
            serde_json::from_str(r#"{"response": "hello", "done": true}"#).unwrap();
        assert_eq!(body.response, "hello");
        assert!(body.eval_count.is_none());
    }
}
