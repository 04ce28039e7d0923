//! Dashboard route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::server::AppState;
use crate::agents::ToolName;
use crate::constants::data::{MAX_DAYS_BACK, MIN_DAYS_BACK};
use crate::constants::projects::ALL_PROJECTS;
use crate::data::ProjectSnapshot;
use crate::risk::charts::{
    CategoryCount, GAUGE_BANDS, Heatmap, LevelCount, TrendChart, heatmap, trend_chart,
};
use crate::risk::{
    csv_filename, format_risk_report_at, generate_risk_report_summary, risks_to_csv,
};
use crate::types::{
    ChatMessage, ParseWithDefault, Result, Risk, RiskCategory, RiskError, RiskLevel,
};

const PAGE: &str = include_str!("page.html");
const SEARCH_LIMIT: usize = 10;
const NO_SEARCH_MATCHES: &str = "No matching risks found. Showing all risks.";
const NO_FILTER_MATCHES: &str = "No risks match your current filters.";

// =============================================================================
// Query Parameters
// =============================================================================

/// Sidebar state shared by every view endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub project: Option<String>,
    pub days: Option<u32>,
    /// Comma separated level names; empty means all
    pub levels: Option<String>,
    /// Comma separated category names; empty means all
    pub categories: Option<String>,
    /// Free-text risk search
    pub q: Option<String>,
    /// `markdown` for a raw report body
    pub format: Option<String>,
}

impl ViewQuery {
    fn project(&self) -> &str {
        self.project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(ALL_PROJECTS)
    }

    fn days(&self, default: u32) -> Result<u32> {
        let days = self.days.unwrap_or(default);
        if !(MIN_DAYS_BACK..=MAX_DAYS_BACK).contains(&days) {
            return Err(RiskError::Validation(format!(
                "days must be between {} and {}, got {}",
                MIN_DAYS_BACK, MAX_DAYS_BACK, days
            )));
        }
        Ok(days)
    }

    fn levels(&self) -> Result<Vec<RiskLevel>> {
        split_list(self.levels.as_deref())
            .map(|s| {
                RiskLevel::try_parse(s)
                    .ok_or_else(|| RiskError::Validation(format!("Unknown risk level: {}", s)))
            })
            .collect()
    }

    fn categories(&self) -> Vec<RiskCategory> {
        split_list(self.categories.as_deref())
            .map(RiskCategory::from)
            .collect()
    }

    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// =============================================================================
// Risk Selection
// =============================================================================

/// Risks visible under the current sidebar state
struct Selection {
    project: String,
    snapshot: Arc<ProjectSnapshot>,
    risks: Vec<Risk>,
    searched: bool,
    message: Option<&'static str>,
}

async fn select_risks(state: &AppState, query: &ViewQuery) -> Result<Selection> {
    let ctx = &state.ctx;
    let project = query.project().to_string();
    let days = query.days(ctx.config.dashboard.default_days_back)?;
    let levels = query.levels()?;
    let categories = query.categories();
    let snapshot = ctx.data.get_project_data(&project, days)?;

    let mut message = None;
    let mut searched = false;
    let base = match query.search() {
        Some(q) => {
            let scope = if project == ALL_PROJECTS {
                None
            } else {
                Some(ctx.repository.resolve_project_id(&project).await)
            };
            let found = ctx
                .repository
                .query_risks(q, scope.as_deref(), SEARCH_LIMIT)
                .await;
            if found.is_empty() {
                message = Some(NO_SEARCH_MATCHES);
                snapshot.risks.clone()
            } else {
                searched = true;
                found
            }
        }
        None => snapshot.risks.clone(),
    };

    let scorer = ctx.data.scorer();
    let risks: Vec<Risk> = base
        .into_iter()
        .map(|mut risk| {
            let score = risk.raw_score();
            risk.level = Some(scorer.risk_level(&risk));
            risk.score = Some(score);
            risk
        })
        .filter(|r| levels.is_empty() || r.level.is_some_and(|l| levels.contains(&l)))
        .filter(|r| categories.is_empty() || categories.contains(&r.category))
        .collect();

    if risks.is_empty() {
        message = Some(NO_FILTER_MATCHES);
    }

    Ok(Selection {
        project,
        snapshot,
        risks,
        searched,
        message,
    })
}

// =============================================================================
// Pages and Metadata
// =============================================================================

pub async fn index() -> Html<&'static str> {
    Html(PAGE)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "riskwatch",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn meta(State(state): State<AppState>) -> Json<Value> {
    let ctx = &state.ctx;
    let levels: Vec<Value> = RiskLevel::ALL
        .iter()
        .map(|l| json!({ "level": l, "color": l.color() }))
        .collect();
    let categories: Vec<String> = RiskCategory::all()
        .into_iter()
        .map(String::from)
        .collect();
    let thresholds: Vec<Value> = ctx
        .data
        .scorer()
        .thresholds()
        .reference_lines()
        .iter()
        .map(|(level, value)| json!({ "label": format!("{} Risk", level), "value": value }))
        .collect();

    Json(json!({
        "name": ctx.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "llm_enabled": ctx.llm_enabled(),
        "vector_store": ctx.repository.store().name(),
        "projects": ctx.data.project_names(),
        "levels": levels,
        "categories": categories,
        "days": {
            "min": MIN_DAYS_BACK,
            "max": MAX_DAYS_BACK,
            "default": ctx.config.dashboard.default_days_back,
        },
        "thresholds": thresholds,
        "gauge_bands": GAUGE_BANDS,
    }))
}

pub async fn projects(State(state): State<AppState>) -> Json<Value> {
    let stored = state.ctx.repository.get_all_projects().await;
    Json(json!({
        "selectable": state.ctx.data.project_names(),
        "stored": stored,
    }))
}

// =============================================================================
// Dashboard Tab
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Metrics {
    pub total_risks: usize,
    pub high_risks: usize,
    pub risk_trend: String,
    pub mitigation_rate: String,
    pub overall_score: u32,
    pub overall_level: RiskLevel,
    pub overall_color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub project: String,
    pub days_back: u32,
    pub status: String,
    pub completion_percentage: u32,
    pub budget_status: String,
    pub resource_utilization: u32,
    pub metrics: Metrics,
    pub trend: TrendChart,
    pub categories: Vec<CategoryCount>,
    pub levels: Vec<LevelCount>,
    pub heatmap: Heatmap,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<DashboardView>> {
    let ctx = &state.ctx;
    let project = query.project().to_string();
    let days = query.days(ctx.config.dashboard.default_days_back)?;
    let snapshot = ctx.data.get_project_data(&project, days)?;
    debug!("Dashboard view for '{}' over {} days", project, days);

    let thresholds = ctx.data.scorer().thresholds();
    let metrics = Metrics {
        total_risks: snapshot.risks.len(),
        high_risks: snapshot.high_risk_count(),
        risk_trend: format!("{:+.1}%", snapshot.risk_trend),
        mitigation_rate: format!("{:.1}%", snapshot.mitigation_rate),
        overall_score: snapshot.overall_score,
        overall_level: snapshot.overall_level,
        overall_color: snapshot.overall_level.color(),
    };

    Ok(Json(DashboardView {
        project,
        days_back: days,
        status: snapshot.status.clone(),
        completion_percentage: snapshot.completion_percentage,
        budget_status: snapshot.budget_status.clone(),
        resource_utilization: snapshot.resource_utilization,
        metrics,
        trend: trend_chart(&snapshot.trend_data, thresholds),
        categories: snapshot.risk_by_category.clone(),
        levels: snapshot.risk_by_level.clone(),
        heatmap: heatmap(&snapshot.risks),
    }))
}

// =============================================================================
// Risk Analysis Tab
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RiskItem {
    #[serde(flatten)]
    pub risk: Risk,
    /// Expander heading, e.g. "High Risk: Data loss during migration"
    pub heading: String,
    pub color: &'static str,
}

impl From<Risk> for RiskItem {
    fn from(risk: Risk) -> Self {
        let level = risk.level.unwrap_or(RiskLevel::Low);
        Self {
            heading: format!("{} Risk: {}", level, risk.name),
            color: level.color(),
            risk,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RiskListView {
    pub project: String,
    pub total: usize,
    pub searched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub summary: String,
    pub risks: Vec<RiskItem>,
}

pub async fn risks(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<RiskListView>> {
    let selection = select_risks(&state, &query).await?;
    let summary = generate_risk_report_summary(
        &selection.project,
        &selection.risks,
        state.ctx.data.scorer().thresholds(),
    );

    Ok(Json(RiskListView {
        total: selection.risks.len(),
        project: selection.project,
        searched: selection.searched,
        message: selection.message,
        summary,
        risks: selection.risks.into_iter().map(RiskItem::from).collect(),
    }))
}

pub async fn risks_csv(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let selection = select_risks(&state, &query).await?;
    let body = risks_to_csv(&selection.risks, state.ctx.data.scorer().thresholds())?;
    let filename = csv_filename(&selection.project, Utc::now().date_naive());
    info!(
        "Exported {} risks to {}",
        selection.risks.len(),
        filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

pub async fn report(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Result<Response> {
    let selection = select_risks(&state, &query).await?;
    let scorer = state.ctx.data.scorer();
    let summary = scorer.score(&selection.risks);
    let content = format_risk_report_at(
        &selection.project,
        &selection.risks,
        summary.score,
        scorer.thresholds(),
        Utc::now(),
    );

    if query.format.as_deref() == Some("markdown") {
        return Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            content,
        )
            .into_response());
    }

    Ok(Json(json!({
        "project": selection.project,
        "overall_score": summary.score,
        "overall_level": summary.level,
        "status": selection.snapshot.status,
        "content": content,
    }))
    .into_response())
}

// =============================================================================
// Chat Tab
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub project: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Vec<ChatMessage>,
}

pub async fn chat_history(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.ctx.chat.load())
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(RiskError::Validation("message must not be empty".into()));
    }
    let project = request
        .project
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(ALL_PROJECTS);

    let _guard = state.chat_lock.lock().await;
    let (reply, history) = state.ctx.converse(message, project).await?;
    Ok(Json(ChatResponse { reply, history }))
}

pub async fn clear_chat(State(state): State<AppState>) -> Result<StatusCode> {
    let _guard = state.chat_lock.lock().await;
    state.ctx.chat.clear()?;
    info!("Chat history cleared");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Tools
// =============================================================================

pub async fn list_tools() -> Json<Vec<Value>> {
    Json(
        ToolName::ALL
            .iter()
            .map(|t| json!({ "name": t.as_str(), "description": t.description() }))
            .collect(),
    )
}

pub async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>> {
    let tool: ToolName = name.parse()?;
    Ok(Json(state.ctx.tools.execute(tool, &args).await))
}
