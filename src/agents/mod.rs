//! Multi-Agent Risk Analysis
//!
//! A fixed pipeline of five LLM agents answers chat questions:
//! market analysis and project status first, then risk scoring, an
//! integrated assessment, and finally a conversational report.

pub mod crew;
pub mod definitions;
pub mod tasks;
pub mod tools;

pub use crew::{AgentProviders, CrewResult, RiskCrew, TaskOutput, build_agent_providers};
pub use definitions::{AgentDefinition, AgentId};
pub use tasks::{TaskKind, TaskPlan, build_tasks, user_context};
pub use tools::{ToolName, ToolOutput, ToolRegistry};
