//! Router assembly and the HTTP listener.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::context::AppContext;
use crate::types::Result;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub ctx: AppContext,
    /// Serializes read-modify-write of the chat history file
    pub(crate) chat_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            chat_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/meta", get(handlers::meta))
        .route("/api/projects", get(handlers::projects))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/risks", get(handlers::risks))
        .route("/api/risks.csv", get(handlers::risks_csv))
        .route("/api/report", get(handlers::report))
        .route(
            "/api/chat",
            get(handlers::chat_history)
                .post(handlers::post_chat)
                .delete(handlers::clear_chat),
        )
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/tools/:name", post(handlers::run_tool))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the dashboard until Ctrl-C. `address` overrides the configured bind address.
pub async fn serve(ctx: AppContext, address: Option<String>) -> Result<()> {
    let address = address.unwrap_or_else(|| ctx.config.dashboard.address());
    let listener = TcpListener::bind(&address).await?;
    info!("Dashboard listening on http://{}", address);

    axum::serve(listener, create_router(AppState::new(ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
