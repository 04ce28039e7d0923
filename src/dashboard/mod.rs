//! Web Dashboard
//!
//! A single-page UI served by axum, backed by a small JSON API:
//! - `/api/dashboard`: metrics and chart payloads for one project
//! - `/api/risks`: the filtered, searchable risk register (also as CSV)
//! - `/api/report`: markdown risk report
//! - `/api/chat`: the agent-backed chat assistant

mod handlers;
mod server;

pub use handlers::{ChatRequest, ChatResponse, DashboardView, Metrics, RiskItem, RiskListView};
pub use server::{AppState, create_router, serve};
