//! Project, market and report records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked IT project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

fn default_status() -> String {
    "Unknown".to_string()
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            status: default_status(),
            start_date: String::new(),
            end_date: String::new(),
            budget: 0.0,
            team_size: None,
            client: None,
            industry: None,
        }
    }
}

/// Kind of market signal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDataKind {
    IndustryTrend,
    EconomicIndicator,
    TechnologyTrend,
    SecurityAlert,
    RegulatoryChange,
    CompetitorActivity,
    ExternalRiskAnalysis,
    #[serde(untagged)]
    Other(String),
}

impl MarketDataKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IndustryTrend => "industry_trend",
            Self::EconomicIndicator => "economic_indicator",
            Self::TechnologyTrend => "technology_trend",
            Self::SecurityAlert => "security_alert",
            Self::RegulatoryChange => "regulatory_change",
            Self::CompetitorActivity => "competitor_activity",
            Self::ExternalRiskAnalysis => "external_risk_analysis",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for MarketDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External market signal relevant to project risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataEntry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MarketDataKind,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Generated risk report stored for later retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: u32,
    #[serde(default)]
    pub summary: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
}
