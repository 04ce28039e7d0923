//! Agent Tools
//!
//! Deterministic functions the agents consult before prompting. Every tool
//! takes a JSON argument object and returns JSON; failures never escape as
//! errors but come back as `{"error": "..."}`.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::ai::{SharedProvider, parse_or_raw};
use crate::constants::data::{DEFAULT_DAYS_BACK, DEFAULT_REPORT_LIMIT, MARKET_WINDOW_HOURS};
use crate::constants::projects::{ALL_PROJECTS, DEFAULT_PROJECTS};
use crate::data::{ProjectDataService, ProjectSnapshot};
use crate::risk::{analyze_trend, format_risk_report};
use crate::storage::RiskRepository;
use crate::types::{
    MarketDataEntry, MarketDataKind, ParseWithDefault, Report, Result, Risk, RiskCategory,
    RiskError, RiskLevel, RiskStatus, log_filter_warn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ProjectInfo,
    RiskAnalysis,
    MarketAnalysis,
    MitigationStrategies,
    ProjectComparison,
    CalculateRiskScore,
    AnalyzeRiskTrends,
    AnalyzeProjectHealth,
    GenerateRiskReport,
    GetProjectReports,
    AddRisk,
    UpdateRisk,
    IdentifyExternalRisks,
}

impl ToolName {
    pub const ALL: [ToolName; 13] = [
        ToolName::ProjectInfo,
        ToolName::RiskAnalysis,
        ToolName::MarketAnalysis,
        ToolName::MitigationStrategies,
        ToolName::ProjectComparison,
        ToolName::CalculateRiskScore,
        ToolName::AnalyzeRiskTrends,
        ToolName::AnalyzeProjectHealth,
        ToolName::GenerateRiskReport,
        ToolName::GetProjectReports,
        ToolName::AddRisk,
        ToolName::UpdateRisk,
        ToolName::IdentifyExternalRisks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectInfo => "project_info",
            Self::RiskAnalysis => "risk_analysis",
            Self::MarketAnalysis => "market_analysis",
            Self::MitigationStrategies => "mitigation_strategies",
            Self::ProjectComparison => "project_comparison",
            Self::CalculateRiskScore => "calculate_risk_score",
            Self::AnalyzeRiskTrends => "analyze_risk_trends",
            Self::AnalyzeProjectHealth => "analyze_project_health",
            Self::GenerateRiskReport => "generate_risk_report",
            Self::GetProjectReports => "get_project_reports",
            Self::AddRisk => "add_risk",
            Self::UpdateRisk => "update_risk",
            Self::IdentifyExternalRisks => "identify_external_risks",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ProjectInfo => {
                "Project status including schedule, budget, resources and key metrics"
            }
            Self::RiskAnalysis => {
                "Risk counts by severity, top risks, trend and category breakdown"
            }
            Self::MarketAnalysis => {
                "Market conditions, industry trends and external factors affecting the project"
            }
            Self::MitigationStrategies => {
                "Mitigation strategies for risks, optionally filtered by category and level"
            }
            Self::ProjectComparison => {
                "Compare risk profiles of a comma-separated list of projects"
            }
            Self::CalculateRiskScore => "Weighted overall risk score and level",
            Self::AnalyzeRiskTrends => "Direction and size of recent risk score movement",
            Self::AnalyzeProjectHealth => "Overall project health with the concerns driving it",
            Self::GenerateRiskReport => "Generate and store a markdown risk report",
            Self::GetProjectReports => "Previously generated reports, newest first",
            Self::AddRisk => "Register a new risk for a project",
            Self::UpdateRisk => "Update fields of an existing risk",
            Self::IdentifyExternalRisks => {
                "Use the language model to identify external risks from market signals"
            }
        }
    }

    /// Arguments used when an agent consults the tool on its own.
    /// `None` for tools that need caller-supplied input.
    pub fn default_args(&self, project: &str, days_back: u32) -> Option<Value> {
        match self {
            Self::AddRisk | Self::UpdateRisk => None,
            Self::ProjectComparison => Some(json!({ "projects": comparison_list(project) })),
            _ => Some(json!({ "project_name": project, "days_back": days_back })),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().trim_end_matches("_tool");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| RiskError::not_found("tool", s))
    }
}

fn comparison_list(project: &str) -> String {
    if DEFAULT_PROJECTS.contains(&project) {
        project.to_string()
    } else {
        DEFAULT_PROJECTS.join(", ")
    }
}

/// Result of one tool call
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub tool: ToolName,
    pub output: Value,
}

impl ToolOutput {
    pub fn is_error(&self) -> bool {
        self.output.get("error").is_some()
    }
}

// =============================================================================
// Arguments
// =============================================================================

fn default_days() -> u32 {
    DEFAULT_DAYS_BACK
}

#[derive(Debug, Deserialize)]
struct ProjectArgs {
    #[serde(alias = "project")]
    project_name: String,
    #[serde(default = "default_days")]
    days_back: u32,
}

#[derive(Debug, Deserialize)]
struct MitigationArgs {
    #[serde(alias = "project")]
    project_name: String,
    #[serde(default)]
    risk_category: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComparisonArgs {
    projects: String,
}

#[derive(Debug, Deserialize)]
struct ScoreArgs {
    #[serde(default, alias = "project")]
    project_name: Option<String>,
    #[serde(default)]
    risks: Option<Vec<Risk>>,
}

#[derive(Debug, Deserialize)]
struct ReportsArgs {
    #[serde(alias = "project")]
    project_name: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AddRiskArgs {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default, alias = "project")]
    project_name: Option<String>,
    #[serde(alias = "title")]
    name: String,
    #[serde(default)]
    description: String,
    category: String,
    probability: f64,
    impact: f64,
    #[serde(default)]
    mitigation: String,
    #[serde(default)]
    status: Option<RiskStatus>,
}

#[derive(Debug, Deserialize)]
struct UpdateRiskArgs {
    risk_id: String,
    #[serde(default, alias = "title")]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    impact: Option<f64>,
    #[serde(default)]
    status: Option<RiskStatus>,
    #[serde(default)]
    mitigation: Option<String>,
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| RiskError::Validation(format!("Invalid arguments for {}: {}", tool, e)))
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(RiskError::Validation(format!(
            "{} must be between 0 and 1 (or a percentage), got {}",
            field, value
        )));
    }
    Ok(())
}

// =============================================================================
// Registry
// =============================================================================

/// Executes tools against project data and the risk repository
pub struct ToolRegistry {
    data: Arc<ProjectDataService>,
    repository: Arc<RiskRepository>,
    analyst: Option<SharedProvider>,
}

impl ToolRegistry {
    pub fn new(data: Arc<ProjectDataService>, repository: Arc<RiskRepository>) -> Self {
        Self {
            data,
            repository,
            analyst: None,
        }
    }

    /// Model used by `identify_external_risks`
    pub fn with_analyst(mut self, provider: SharedProvider) -> Self {
        self.analyst = Some(provider);
        self
    }

    pub fn data(&self) -> &Arc<ProjectDataService> {
        &self.data
    }

    pub fn repository(&self) -> &Arc<RiskRepository> {
        &self.repository
    }

    /// Run a tool; failures become `{"error": ...}`
    pub async fn execute(&self, tool: ToolName, args: &Value) -> Value {
        match self.run(tool, args).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Tool {} failed: {}", tool, e);
                RiskError::tool(tool.as_str(), e.to_string()).to_json()
            }
        }
    }

    /// Run independent tool calls concurrently, preserving call order
    pub async fn execute_all(&self, calls: Vec<(ToolName, Value)>) -> Vec<ToolOutput> {
        join_all(calls.into_iter().map(|(tool, args)| async move {
            let output = self.execute(tool, &args).await;
            ToolOutput { tool, output }
        }))
        .await
    }

    pub async fn run(&self, tool: ToolName, args: &Value) -> Result<Value> {
        debug!("Running tool {} with {}", tool, args);
        match tool {
            ToolName::ProjectInfo => self.project_info(parse_args(tool, args)?),
            ToolName::RiskAnalysis => self.risk_analysis(parse_args(tool, args)?),
            ToolName::MarketAnalysis => self.market_analysis(parse_args(tool, args)?),
            ToolName::MitigationStrategies => self.mitigation_strategies(parse_args(tool, args)?),
            ToolName::ProjectComparison => self.project_comparison(parse_args(tool, args)?),
            ToolName::CalculateRiskScore => self.calculate_risk_score(parse_args(tool, args)?),
            ToolName::AnalyzeRiskTrends => self.analyze_risk_trends(parse_args(tool, args)?),
            ToolName::AnalyzeProjectHealth => self.analyze_project_health(parse_args(tool, args)?),
            ToolName::GenerateRiskReport => {
                self.generate_risk_report(parse_args(tool, args)?).await
            }
            ToolName::GetProjectReports => self.get_project_reports(parse_args(tool, args)?).await,
            ToolName::AddRisk => self.add_risk(parse_args(tool, args)?).await,
            ToolName::UpdateRisk => self.update_risk(parse_args(tool, args)?).await,
            ToolName::IdentifyExternalRisks => {
                self.identify_external_risks(parse_args(tool, args)?).await
            }
        }
    }

    fn snapshot(&self, project: &str, days_back: u32) -> Result<Arc<ProjectSnapshot>> {
        self.data.get_project_data(project, days_back)
    }

    // -------------------------------------------------------------------------
    // Read-only tools
    // -------------------------------------------------------------------------

    fn project_info(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;
        Ok(json!({
            "name": args.project_name,
            "status": s.status,
            "completion_percentage": s.completion_percentage,
            "budget_status": s.budget_status,
            "resource_utilization": s.resource_utilization,
            "start_date": s.start_date,
            "end_date": s.end_date,
            "key_metrics": s.key_metrics,
        }))
    }

    fn risk_analysis(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;

        let mut top: Vec<&Risk> = s
            .risks
            .iter()
            .filter(|r| r.level.is_some_and(|l| l.is_elevated()))
            .collect();
        top.sort_by(|a, b| b.raw_score().cmp(&a.raw_score()));
        top.truncate(3);

        Ok(json!({
            "project": args.project_name,
            "total_risks": s.risks.len(),
            "high_priority_risks": s.high_risk_count(),
            "medium_priority_risks": s.count_at(RiskLevel::Medium),
            "low_priority_risks": s.count_at(RiskLevel::Low),
            "risk_trend": s.risk_trend,
            "top_risks": top,
            "risk_categories": s.risk_by_category,
        }))
    }

    fn market_analysis(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;
        Ok(serde_json::to_value(&s.market_data)?)
    }

    fn mitigation_strategies(&self, args: MitigationArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, DEFAULT_DAYS_BACK)?;

        let category = args.risk_category.as_deref().map(RiskCategory::from);
        let level = match args.risk_level.as_deref() {
            Some(raw) => Some(RiskLevel::try_parse(raw).ok_or_else(|| {
                RiskError::Validation(format!("Unknown risk level '{}'", raw))
            })?),
            None => None,
        };

        let matching: Vec<&Risk> = s
            .risks
            .iter()
            .filter(|r| category.as_ref().is_none_or(|c| &r.category == c))
            .filter(|r| level.is_none_or(|l| r.level == Some(l)))
            .collect();

        if matching.is_empty() {
            return Ok(Value::String(format!(
                "No risks found matching the specified criteria for project '{}'.",
                args.project_name
            )));
        }

        let strategies: Vec<Value> = matching
            .iter()
            .map(|r| {
                json!({
                    "risk_title": r.name,
                    "risk_level": r.level,
                    "risk_category": r.category,
                    "mitigation_strategies": r.mitigation_items(),
                })
            })
            .collect();

        Ok(json!({
            "project": args.project_name,
            "risk_count": matching.len(),
            "strategies": strategies,
        }))
    }

    fn project_comparison(&self, args: ComparisonArgs) -> Result<Value> {
        let valid: Vec<&str> = args
            .projects
            .split(',')
            .map(str::trim)
            .filter(|p| DEFAULT_PROJECTS.contains(p) || *p == ALL_PROJECTS)
            .collect();

        if valid.is_empty() {
            return Ok(Value::String(format!(
                "No valid projects found in the list: {}. Available projects are: {}",
                args.projects,
                DEFAULT_PROJECTS.join(", ")
            )));
        }

        let mut projects = Vec::with_capacity(valid.len());
        for name in valid {
            let s = self.snapshot(name, DEFAULT_DAYS_BACK)?;
            let top_categories: Vec<&str> = s
                .risk_by_category
                .iter()
                .take(3)
                .map(|c| c.category.as_str())
                .collect();
            projects.push(json!({
                "name": name,
                "total_risks": s.risks.len(),
                "high_risks": s.high_risk_count(),
                "risk_trend": s.risk_trend,
                "top_risk_categories": top_categories,
                "mitigation_rate": s.mitigation_rate,
            }));
        }

        Ok(json!({ "projects": projects }))
    }

    fn calculate_risk_score(&self, args: ScoreArgs) -> Result<Value> {
        let scorer = self.data.scorer();
        let (project, risks) = match (args.risks, args.project_name) {
            (Some(risks), project) => (project.unwrap_or_default(), risks),
            (None, Some(project)) => {
                let s = self.snapshot(&project, DEFAULT_DAYS_BACK)?;
                (project, s.risks.clone())
            }
            (None, None) => {
                return Err(RiskError::Validation(
                    "Either project_name or risks is required".to_string(),
                ));
            }
        };

        let summary = scorer.score(&risks);
        let per_risk: Vec<Value> = risks
            .iter()
            .map(|r| {
                json!({
                    "name": r.name,
                    "category": r.category,
                    "score": r.raw_score(),
                    "level": scorer.risk_level(r),
                })
            })
            .collect();

        Ok(json!({
            "project": project,
            "overall_score": summary.score,
            "risk_level": summary.level,
            "risk_count": risks.len(),
            "risks": per_risk,
        }))
    }

    fn analyze_risk_trends(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;
        let analysis = analyze_trend(&s.trend_data);
        Ok(json!({
            "project": args.project_name,
            "days_back": args.days_back,
            "direction": analysis.direction,
            "recent_change_pct": (analysis.change_pct * 10.0).round() / 10.0,
            "current_score": analysis.current,
            "previous_score": analysis.previous,
            "window_change_pct": s.risk_trend,
            "points": analysis.points,
        }))
    }

    fn analyze_project_health(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;
        let concerns = health_concerns(&s);
        let health = match concerns.len() {
            0 => "Healthy",
            1 | 2 => "At Risk",
            _ => "Critical",
        };

        Ok(json!({
            "project": args.project_name,
            "health": health,
            "status": s.status,
            "completion_percentage": s.completion_percentage,
            "budget_status": s.budget_status,
            "resource_utilization": s.resource_utilization,
            "overall_score": s.overall_score,
            "overall_level": s.overall_level,
            "concerns": concerns,
        }))
    }

    // -------------------------------------------------------------------------
    // Repository-backed tools
    // -------------------------------------------------------------------------

    async fn generate_risk_report(&self, args: ProjectArgs) -> Result<Value> {
        let s = self.snapshot(&args.project_name, args.days_back)?;
        let content = format_risk_report(&args.project_name, &s.risks, s.overall_score);

        let report = Report {
            id: String::new(),
            project_id: self.repository.resolve_project_id(&args.project_name).await,
            timestamp: Utc::now(),
            overall_score: s.overall_score,
            summary: format!(
                "{} risks, {} high priority, overall {} risk ({})",
                s.risks.len(),
                s.high_risk_count(),
                s.overall_level,
                s.overall_score
            ),
            content,
        };
        let report_id = self.repository.store_report(&report).await?;
        info!("Generated risk report {} for {}", report_id, args.project_name);

        Ok(json!({
            "report_id": report_id,
            "project": args.project_name,
            "overall_score": report.overall_score,
            "risk_level": s.overall_level,
            "summary": report.summary,
            "stored": self.repository.is_enabled(),
            "content": report.content,
        }))
    }

    async fn get_project_reports(&self, args: ReportsArgs) -> Result<Value> {
        let limit = args.limit.unwrap_or(DEFAULT_REPORT_LIMIT);
        let project_id = self.repository.resolve_project_id(&args.project_name).await;
        let reports = self
            .repository
            .get_project_reports(&project_id, limit)
            .await;
        Ok(json!({
            "project": args.project_name,
            "report_count": reports.len(),
            "reports": reports,
        }))
    }

    async fn add_risk(&self, args: AddRiskArgs) -> Result<Value> {
        if args.name.trim().is_empty() {
            return Err(RiskError::Validation("Risk name is required".to_string()));
        }
        check_unit("probability", args.probability)?;
        check_unit("impact", args.impact)?;

        let project_id = match (args.project_id, args.project_name.as_deref()) {
            (Some(id), _) => id,
            (None, Some(name)) => self.repository.resolve_project_id(name).await,
            (None, None) => String::new(),
        };

        let risk = Risk::new(args.name.trim(), args.category.as_str(), args.probability, args.impact)
            .with_project(project_id)
            .with_description(args.description)
            .with_mitigation(args.mitigation)
            .with_status(args.status.unwrap_or_default());

        let risk_id = self.repository.store_risk(&risk).await?;
        let scorer = self.data.scorer();
        Ok(json!({
            "risk_id": risk_id,
            "status": "created",
            "score": risk.raw_score(),
            "level": scorer.risk_level(&risk),
        }))
    }

    async fn update_risk(&self, args: UpdateRiskArgs) -> Result<Value> {
        let mut risk = self
            .repository
            .get_risk_by_id(&args.risk_id)
            .await
            .ok_or_else(|| RiskError::not_found("risk", &args.risk_id))?;

        if let Some(name) = args.name {
            risk.name = name;
        }
        if let Some(description) = args.description {
            risk.description = description;
        }
        if let Some(category) = args.category {
            risk.category = RiskCategory::from(category);
        }
        if let Some(p) = args.probability {
            check_unit("probability", p)?;
            risk.probability = p;
        }
        if let Some(i) = args.impact {
            check_unit("impact", i)?;
            risk.impact = i;
        }
        if let Some(status) = args.status {
            risk.status = status;
        }
        if let Some(mitigation) = args.mitigation {
            risk.mitigation = mitigation;
        }
        // derived from probability and impact
        risk.score = None;
        risk.level = None;

        self.repository.store_risk(&risk).await?;
        Ok(json!({
            "risk_id": risk.id,
            "status": "updated",
            "risk": risk,
        }))
    }

    // -------------------------------------------------------------------------
    // Model-backed tools
    // -------------------------------------------------------------------------

    async fn identify_external_risks(&self, args: ProjectArgs) -> Result<Value> {
        let provider = self
            .analyst
            .as_ref()
            .ok_or_else(|| RiskError::Config("No language model configured".to_string()))?;

        let s = self.snapshot(&args.project_name, args.days_back)?;
        let recent = self
            .repository
            .get_recent_market_data(MARKET_WINDOW_HOURS, None)
            .await;

        let prompt = external_risks_prompt(&args.project_name, &s, &recent)?;
        let response = provider.generate(&prompt, &Value::Null).await?;
        let analysis = parse_or_raw(response.text());

        if analysis.get("error").is_some() {
            warn!(
                "External risk analysis for {} was not valid JSON",
                args.project_name
            );
            return Ok(analysis);
        }

        let entry = MarketDataEntry {
            id: String::new(),
            kind: MarketDataKind::ExternalRiskAnalysis,
            timestamp: Utc::now(),
            summary: format!("External risk analysis for {}", args.project_name),
            details: analysis.to_string(),
            source: Some(provider.name().to_string()),
        };
        log_filter_warn(
            self.repository.store_market_data(&entry).await,
            "Failed to store external risk analysis",
        );

        Ok(json!({
            "project": args.project_name,
            "analysis": analysis,
        }))
    }
}

fn health_concerns(s: &ProjectSnapshot) -> Vec<String> {
    let mut concerns = Vec::new();
    if s.budget_status == "Over Budget" {
        concerns.push("Spending is over budget".to_string());
    }
    if s.resource_utilization > 90 {
        concerns.push(format!(
            "Team is over-allocated ({}% utilization)",
            s.resource_utilization
        ));
    }
    if let Some(spi) = s.key_metrics.get("schedule_performance_index")
        && *spi < 0.9
    {
        concerns.push(format!("Schedule is slipping (SPI {:.2})", spi));
    }
    let elevated = s.high_risk_count();
    if elevated > 2 {
        concerns.push(format!("{} high or critical risks are open", elevated));
    }
    if s.risk_trend > 5.0 {
        concerns.push(format!("Risk score rose {:.1}% over the window", s.risk_trend));
    }
    concerns
}

fn external_risks_prompt(
    project: &str,
    snapshot: &ProjectSnapshot,
    recent: &[MarketDataEntry],
) -> Result<String> {
    let signals: Vec<Value> = recent
        .iter()
        .map(|m| json!({ "type": m.kind, "summary": m.summary, "details": m.details }))
        .collect();

    Ok(format!(
        "Identify external risks for the IT project '{project}'.\n\n\
         ## Market Conditions\n{}\n\n\
         ## Recent Market Signals\n{}\n\n\
         Respond with JSON only, in this shape:\n\
         {{\"external_risks\": [{{\"name\": \"...\", \"category\": \"...\", \
         \"probability\": 0.0, \"impact\": 0.0, \"description\": \"...\", \
         \"mitigation\": \"...\"}}], \"summary\": \"...\"}}",
        serde_json::to_string_pretty(&snapshot.market_data)?,
        serde_json::to_string_pretty(&signals)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{HashingEmbedder, LlmProvider, LlmResponse};
    use crate::config::DataConfig;
    use crate::risk::RiskScorer;
    use crate::storage::{Database, SqliteVectorStore};
    use async_trait::async_trait;

    fn registry() -> ToolRegistry {
        let data = Arc::new(ProjectDataService::new(
            &DataConfig {
                refresh_interval_secs: 3600,
                seed: Some(7),
            },
            RiskScorer::default(),
        ));
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = Arc::new(SqliteVectorStore::new(db).unwrap());
        let repository = Arc::new(RiskRepository::new(
            store,
            Arc::new(HashingEmbedder::new(256)),
        ));
        ToolRegistry::new(data, repository)
    }

    struct CannedProvider(&'static str);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<LlmResponse> {
            Ok(LlmResponse::content_only(Value::String(self.0.to_string())))
        }

        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_tool_name_parsing() {
        assert_eq!("risk_analysis".parse::<ToolName>().unwrap(), ToolName::RiskAnalysis);
        assert_eq!(
            "project_info_tool".parse::<ToolName>().unwrap(),
            ToolName::ProjectInfo
        );
        assert!("fetch_weather".parse::<ToolName>().is_err());
    }

    #[test]
    fn test_default_args() {
        assert!(ToolName::AddRisk.default_args("Cloud Migration", 30).is_none());
        let args = ToolName::ProjectComparison
            .default_args(ALL_PROJECTS, 30)
            .unwrap();
        assert_eq!(args["projects"], DEFAULT_PROJECTS.join(", "));
    }

    #[tokio::test]
    async fn test_project_info() {
        let out = registry()
            .execute(
                ToolName::ProjectInfo,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert_eq!(out["name"], "Cloud Migration");
        assert!(out["completion_percentage"].is_u64());
        assert!(out["key_metrics"].is_object());
    }

    #[tokio::test]
    async fn test_risk_analysis_counts_add_up() {
        let out = registry()
            .execute(
                ToolName::RiskAnalysis,
                &json!({"project_name": "ERP Implementation", "days_back": 14}),
            )
            .await;
        let total = out["total_risks"].as_u64().unwrap();
        let parts = out["high_priority_risks"].as_u64().unwrap()
            + out["medium_priority_risks"].as_u64().unwrap()
            + out["low_priority_risks"].as_u64().unwrap();
        assert_eq!(total, parts);
        assert!(out["top_risks"].as_array().unwrap().len() <= 3);
    }

    #[tokio::test]
    async fn test_market_analysis_fields() {
        let out = registry()
            .execute(
                ToolName::MarketAnalysis,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        for key in [
            "industry_trends",
            "economic_indicators",
            "competitor_activities",
            "regulatory_changes",
            "technology_trends",
            "market_risk_impact",
        ] {
            assert!(out.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_mitigation_no_match_message() {
        let out = registry()
            .execute(
                ToolName::MitigationStrategies,
                &json!({"project_name": "Cloud Migration", "risk_category": "Astrology"}),
            )
            .await;
        assert_eq!(
            out,
            Value::String(
                "No risks found matching the specified criteria for project 'Cloud Migration'."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_mitigation_lists_strategies() {
        let out = registry()
            .execute(
                ToolName::MitigationStrategies,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        let strategies = out["strategies"].as_array().unwrap();
        assert_eq!(out["risk_count"].as_u64().unwrap() as usize, strategies.len());
        assert_eq!(
            strategies[0]["mitigation_strategies"].as_array().unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_mitigation_rejects_unknown_level() {
        let out = registry()
            .execute(
                ToolName::MitigationStrategies,
                &json!({"project_name": "Cloud Migration", "risk_level": "Severe"}),
            )
            .await;
        assert!(out["error"].as_str().unwrap().contains("Unknown risk level"));
    }

    #[tokio::test]
    async fn test_project_comparison() {
        let registry = registry();
        let out = registry
            .execute(
                ToolName::ProjectComparison,
                &json!({"projects": "Cloud Migration, Moon Base, ERP Implementation"}),
            )
            .await;
        let projects = out["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1]["name"], "ERP Implementation");
        assert!(projects[0]["top_risk_categories"].as_array().unwrap().len() <= 3);

        let none = registry
            .execute(ToolName::ProjectComparison, &json!({"projects": "Moon Base"}))
            .await;
        assert!(
            none.as_str()
                .unwrap()
                .starts_with("No valid projects found in the list: Moon Base.")
        );
    }

    #[tokio::test]
    async fn test_calculate_risk_score_with_explicit_risks() {
        let out = registry()
            .execute(
                ToolName::CalculateRiskScore,
                &json!({"risks": [
                    {"name": "Breach", "category": "Security", "probability": 1.0, "impact": 1.0}
                ]}),
            )
            .await;
        assert_eq!(out["overall_score"], 15);
        assert_eq!(out["risk_level"], "Low");
        assert_eq!(out["risks"][0]["score"], 100);
    }

    #[tokio::test]
    async fn test_missing_arguments_are_errors() {
        let registry = registry();
        let out = registry.execute(ToolName::ProjectInfo, &json!({})).await;
        assert!(out["error"].as_str().unwrap().contains("project_info"));

        let out = registry
            .execute(ToolName::CalculateRiskScore, &json!({}))
            .await;
        assert!(out.get("error").is_some());
    }

    #[tokio::test]
    async fn test_trend_and_health() {
        let registry = registry();
        let trend = registry
            .execute(
                ToolName::AnalyzeRiskTrends,
                &json!({"project_name": "Cloud Migration", "days_back": 10}),
            )
            .await;
        assert_eq!(trend["points"], 10);

        let health = registry
            .execute(
                ToolName::AnalyzeProjectHealth,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        let label = health["health"].as_str().unwrap();
        assert!(["Healthy", "At Risk", "Critical"].contains(&label));
    }

    #[tokio::test]
    async fn test_report_roundtrip_through_repository() {
        let registry = registry();
        let generated = registry
            .execute(
                ToolName::GenerateRiskReport,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert!(
            generated["content"]
                .as_str()
                .unwrap()
                .contains("Cloud Migration")
        );

        let listed = registry
            .execute(
                ToolName::GetProjectReports,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert_eq!(listed["report_count"], 1);
        assert_eq!(listed["reports"][0]["id"], generated["report_id"]);
    }

    #[tokio::test]
    async fn test_add_then_update_risk() {
        let registry = registry();
        let created = registry
            .execute(
                ToolName::AddRisk,
                &json!({
                    "project_id": "p1001",
                    "title": "Vendor Lock-in",
                    "category": "Vendor",
                    "probability": 0.4,
                    "impact": 0.5
                }),
            )
            .await;
        assert_eq!(created["status"], "created");
        assert_eq!(created["score"], 20);
        let id = created["risk_id"].as_str().unwrap().to_string();

        let updated = registry
            .execute(
                ToolName::UpdateRisk,
                &json!({"risk_id": id, "probability": 0.9, "status": "Mitigated"}),
            )
            .await;
        assert_eq!(updated["status"], "updated");
        assert_eq!(updated["risk"]["status"], "Mitigated");

        let risk = registry.repository().get_risk_by_id(&id).await.unwrap();
        assert_eq!(risk.probability, 0.9);
        assert_eq!(risk.project_id, "p1001");
    }

    #[tokio::test]
    async fn test_score_accepts_bare_risks() {
        let out = registry()
            .execute(
                ToolName::CalculateRiskScore,
                &json!({"risks": [{"probability": 0.3, "impact": 0.9, "category": "Security"}]}),
            )
            .await;
        assert!(out.get("error").is_none(), "{out}");
        assert_eq!(out["risk_count"], 1);
        assert_eq!(out["risks"][0]["score"], 27);
        // 27 * 15%
        assert_eq!(out["overall_score"], 4);
    }

    #[tokio::test]
    async fn test_add_risk_by_project_name() {
        let registry = registry();
        registry
            .repository()
            .populate_sample_data(&crate::data::sample_dataset())
            .await
            .unwrap();

        let created = registry
            .execute(
                ToolName::AddRisk,
                &json!({
                    "project_name": "Cloud Migration",
                    "name": "Licence audit",
                    "category": "Regulatory",
                    "probability": 0.2,
                    "impact": 0.5,
                    "status": "active"
                }),
            )
            .await;
        assert_eq!(created["status"], "created", "{created}");

        let id = created["risk_id"].as_str().unwrap();
        let risk = registry.repository().get_risk_by_id(id).await.unwrap();
        assert_eq!(risk.project_id, "p1001");
        assert_eq!(risk.status, RiskStatus::Active);

        let updated = registry
            .execute(
                ToolName::UpdateRisk,
                &json!({"risk_id": id, "status": "resolved"}),
            )
            .await;
        assert_eq!(updated["risk"]["status"], "Closed");
    }

    #[tokio::test]
    async fn test_add_risk_validates_input() {
        let out = registry()
            .execute(
                ToolName::AddRisk,
                &json!({"name": "x", "category": "Scope", "probability": -1.0, "impact": 0.5}),
            )
            .await;
        assert!(out["error"].as_str().unwrap().contains("probability"));
    }

    #[tokio::test]
    async fn test_update_missing_risk() {
        let out = registry()
            .execute(ToolName::UpdateRisk, &json!({"risk_id": "nope"}))
            .await;
        assert!(out["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_external_risks_without_model() {
        let out = registry()
            .execute(
                ToolName::IdentifyExternalRisks,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert!(out["error"].as_str().unwrap().contains("No language model"));
    }

    #[tokio::test]
    async fn test_external_risks_keeps_raw_output() {
        let registry = registry().with_analyst(Arc::new(CannedProvider("not json, sorry")));
        let out = registry
            .execute(
                ToolName::IdentifyExternalRisks,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert_eq!(out["raw_output"], "not json, sorry");
        assert!(out["error"].as_str().unwrap().starts_with("Failed to parse JSON"));
    }

    #[tokio::test]
    async fn test_external_risks_stores_analysis() {
        let registry = registry().with_analyst(Arc::new(CannedProvider(
            r#"```json
{"external_risks": [{"name": "Rate hike", "category": "Market"}], "summary": "Financing costs rising"}
```"#,
        )));
        let out = registry
            .execute(
                ToolName::IdentifyExternalRisks,
                &json!({"project_name": "Cloud Migration"}),
            )
            .await;
        assert_eq!(out["analysis"]["summary"], "Financing costs rising");

        let stored = registry
            .repository()
            .get_recent_market_data(1, Some(&MarketDataKind::ExternalRiskAnalysis))
            .await;
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_all_preserves_order() {
        let outputs = registry()
            .execute_all(vec![
                (
                    ToolName::ProjectInfo,
                    json!({"project_name": "Cloud Migration"}),
                ),
                (ToolName::UpdateRisk, json!({})),
                (
                    ToolName::MarketAnalysis,
                    json!({"project_name": "Cloud Migration"}),
                ),
            ])
            .await;
        let tools: Vec<ToolName> = outputs.iter().map(|o| o.tool).collect();
        assert_eq!(
            tools,
            vec![
                ToolName::ProjectInfo,
                ToolName::UpdateRisk,
                ToolName::MarketAnalysis
            ]
        );
        assert!(outputs[1].is_error());
        assert!(!outputs[0].is_error());
    }
}
