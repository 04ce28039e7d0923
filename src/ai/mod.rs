//! AI Integration Layer
//!
//! LLM providers for the agent crew, text embeddings for the vector store,
//! and repair of model JSON output.

pub mod embedding;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use embedding::{Embedder, HashingEmbedder, SharedEmbedder, create_embedder};
pub use provider::{
    ChainConfig, ChainedProvider, LlmProvider, LlmResponse, ProviderChain, ProviderChainBuilder,
    ProviderConfig, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage,
    create_agent_provider, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout, with_timeout_map};
pub use validation::{extract_json_from_response, parse_or_raw};
