//! Unified Error Type System
//!
//! Centralized error types for the dashboard, the agent pipeline and storage.
//! LLM failures are classified so the provider chain can decide between
//! retrying, falling back, or giving up.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary issues that may resolve (retry)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Auth**: Authentication failures (fail fast)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Unavailable**: Provider unavailable (fallback to next)

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry and fallback routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry same provider
    RateLimit,
    /// Context/token limit exceeded - fallback
    TokenLimit,
    /// Authentication failed - don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider unavailable - fallback to next
    Unavailable,
    /// Invalid request - don't retry
    BadRequest,
    /// Model output was not parseable
    ParseError,
    /// Temporary server issues - retry same provider
    Transient,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable on the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }

    /// Check if this category should move on to the fallback provider
    pub fn should_fallback(&self) -> bool {
        !matches!(self, Self::BadRequest)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// LLM error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
    /// Suggested wait time before retry
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps provider failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("context length")
            || lower.contains("maximum context")
            || (lower.contains("token") && lower.contains("limit"))
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("failed to connect")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(1));
        }

        if lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("overloaded")
            || lower.contains("temporar")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(2));
        }

        if lower.contains("500") || lower.contains("not found") || lower.contains("404") {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("malformed") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("parse") || lower.contains("json") {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code directly
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(5)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            502..=504 => LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(2)),
            404 | 500 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify an application error raised by a provider call
    pub fn classify_error(err: &RiskError, provider: &str) -> LlmError {
        match err {
            RiskError::Llm(llm) => llm.clone(),
            RiskError::LlmApi(msg) => Self::classify(msg, provider),
            RiskError::LlmParse { message, .. } => {
                LlmError::with_provider(ErrorCategory::ParseError, message.clone(), provider)
            }
            RiskError::Timeout { .. } => {
                LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider)
            }
            RiskError::Config(_) => {
                LlmError::with_provider(ErrorCategory::BadRequest, err.to_string(), provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum RiskError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // LLM Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Model answered, but not with parseable JSON
    #[error("Failed to parse LLM output: {message}")]
    LlmParse { message: String, raw_output: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run 'riskwatch config init' first")]
    NotInitialized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Task '{task}' failed: {message}")]
    Task { task: String, message: String },

    #[error("Export error: {0}")]
    Export(String),
}

impl From<LlmError> for RiskError {
    fn from(err: LlmError) -> Self {
        RiskError::Llm(err)
    }
}

impl From<r2d2::Error> for RiskError {
    fn from(err: r2d2::Error) -> Self {
        RiskError::Storage(format!("Connection pool error: {}", err))
    }
}

impl From<csv::Error> for RiskError {
    fn from(err: csv::Error) -> Self {
        RiskError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl RiskError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::LlmApi(msg) => ErrorClassifier::classify(msg, "").is_retryable(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The `{"error": ...}` shape returned to callers that never see a Rust error
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::LlmParse {
                message,
                raw_output,
            } => json!({ "error": message, "raw_output": raw_output }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

// =============================================================================
// HTTP Mapping
// =============================================================================

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RiskError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            RiskError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            RiskError::Config(_) | RiskError::NotInitialized => {
                (StatusCode::SERVICE_UNAVAILABLE, "configuration_error")
            }
            RiskError::Llm(_)
            | RiskError::LlmApi(_)
            | RiskError::LlmParse { .. }
            | RiskError::Timeout { .. } => (StatusCode::BAD_GATEWAY, "llm_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": error_type,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| RiskError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| RiskError::Storage(format!("{}: {}", f().into(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Network.to_string(), "NETWORK");
    }

    #[test]
    fn test_category_routing() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::ParseError.is_retryable());

        assert!(ErrorCategory::Auth.should_fallback());
        assert!(!ErrorCategory::BadRequest.should_fallback());
    }

    #[test]
    fn test_classify_connection_refused() {
        let err = ErrorClassifier::classify(
            "Failed to connect to Ollama at http://localhost:11434",
            "ollama",
        );
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.is_retryable());
        assert_eq!(err.provider.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_classify_auth_and_rate_limit() {
        assert_eq!(
            ErrorClassifier::classify("OpenAI API error (401): invalid api key", "openai")
                .category,
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify("429 Too Many Requests", "openai").category,
            ErrorCategory::RateLimit
        );
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_http_status(503, "busy", "openai").category,
            ErrorCategory::Transient
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(404, "no model", "ollama").category,
            ErrorCategory::Unavailable
        );
    }

    #[test]
    fn test_parse_error_json_shape() {
        let err = RiskError::LlmParse {
            message: "expected value at line 1".to_string(),
            raw_output: "Sure! Here are the risks".to_string(),
        };
        let value = err.to_json();
        assert_eq!(value["raw_output"], "Sure! Here are the risks");
        assert!(value["error"].as_str().unwrap().contains("expected value"));
    }

    #[test]
    fn test_plain_error_json_shape() {
        let value = RiskError::not_found("Project", "p9999").to_json();
        assert_eq!(value["error"], "Project not found: p9999");
        assert!(value.get("raw_output").is_none());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(RiskError::timeout("generate", Duration::from_secs(1)).is_recoverable());
        assert!(RiskError::LlmApi("connection reset".to_string()).is_recoverable());
        assert!(!RiskError::Config("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_into_response_status() {
        let response = RiskError::not_found("Project", "x").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = RiskError::Validation("days".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_result_ext_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = res.with_context("Failed to save chat history").unwrap_err();
        assert!(err.to_string().contains("Failed to save chat history"));
        assert!(err.to_string().contains("disk full"));
    }
}
