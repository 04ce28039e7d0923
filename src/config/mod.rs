//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/riskwatch/config.toml)
//! 3. Project config (.riskwatch/config.toml)
//! 4. Environment variables (RISKWATCH_*, then OPENAI_API_KEY, PINECONE_*, ...)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
