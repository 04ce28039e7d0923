//! RiskWatch - AI Project Risk Management Dashboard
//!
//! Tracks IT project risks, scores them, and answers questions about them
//! through a crew of cooperating LLM agents.
//!
//! ## Core Features
//!
//! - **Risk Scoring**: category-weighted aggregate scores and level bucketing
//! - **Dashboard**: axum web UI with trend, category and heatmap charts
//! - **Multi-Agent Chat**: five agents backed by Ollama or OpenAI
//! - **Vector Store**: SQLite or Pinecone similarity search over risks
//! - **Provider Chain**: retry and fallback across LLM backends
//!
//! ## Quick Start
//!
//! ```ignore
//! use riskwatch::{AppContext, dashboard};
//!
//! let ctx = AppContext::load()?;
//! let answer = ctx.ask("What are the top budget risks?", "Cloud Migration").await;
//! dashboard::serve(ctx, None).await?;
//! ```
//!
//! ## Modules
//!
//! - [`risk`]: scoring, trends, reports and chart payloads
//! - [`data`]: mock project snapshots and the sample dataset
//! - [`storage`]: vector stores, the risk repository and chat history
//! - [`ai`]: LLM providers, embeddings and JSON repair
//! - [`agents`]: agent definitions, tools, tasks and the crew
//! - [`dashboard`]: HTTP server and JSON API

pub mod agents;
pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod dashboard;
pub mod data;
pub mod risk;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, Result, ResultExt, RiskError};

// Domain
pub use types::{ChatMessage, Project, Risk, RiskCategory, RiskLevel, RiskStatus};

// Application
pub use context::AppContext;

// =============================================================================
// Risk Re-exports
// =============================================================================

pub use risk::{RiskScorer, RiskThresholds, ScoreSummary, calculate_risk_score, get_risk_level};

// =============================================================================
// Storage Re-exports
// =============================================================================

pub use storage::{ChatHistory, Database, RiskRepository, SharedDatabase};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use agents::{CrewResult, RiskCrew, ToolName, ToolRegistry};
pub use ai::{LlmProvider, LlmResponse, ProviderChain, ProviderChainBuilder, TimeoutConfig};
