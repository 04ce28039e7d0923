//! Risk records and their taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{colors, risk as risk_constants};
use crate::types::utils::ParseWithDefault;

// =============================================================================
// Category
// =============================================================================

/// Risk category. Unknown labels are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskCategory {
    Resource,
    Schedule,
    Budget,
    Technical,
    Quality,
    Scope,
    Communication,
    External,
    Vendor,
    Regulatory,
    Market,
    Security,
    Other(String),
}

impl RiskCategory {
    /// Every canonical category, in display order
    pub fn all() -> Vec<RiskCategory> {
        risk_constants::CATEGORIES
            .iter()
            .map(|c| RiskCategory::from(*c))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Resource => "Resource",
            Self::Schedule => "Schedule",
            Self::Budget => "Budget",
            Self::Technical => "Technical",
            Self::Quality => "Quality",
            Self::Scope => "Scope",
            Self::Communication => "Communication",
            Self::External => "External",
            Self::Vendor => "Vendor",
            Self::Regulatory => "Regulatory",
            Self::Market => "Market",
            Self::Security => "Security",
            Self::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Unlabelled; scored with the unknown-category weight
impl Default for RiskCategory {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<&str> for RiskCategory {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "resource" => Self::Resource,
            "schedule" => Self::Schedule,
            "budget" => Self::Budget,
            "technical" => Self::Technical,
            "quality" => Self::Quality,
            "scope" => Self::Scope,
            "communication" => Self::Communication,
            "external" => Self::External,
            "vendor" => Self::Vendor,
            "regulatory" => Self::Regulatory,
            "market" => Self::Market,
            "security" => Self::Security,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for RiskCategory {
    fn from(s: String) -> Self {
        RiskCategory::from(s.as_str())
    }
}

impl From<RiskCategory> for String {
    fn from(c: RiskCategory) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Level
// =============================================================================

/// Severity bucket derived from a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Dashboard color for this level
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => colors::LOW,
            Self::Medium => colors::MEDIUM,
            Self::High => colors::HIGH,
            Self::Critical => colors::CRITICAL,
        }
    }

    /// High and Critical both count as "high risk" in dashboard metrics
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParseWithDefault for RiskLevel {
    fn type_name() -> &'static str {
        "RiskLevel"
    }

    fn default_value() -> Self {
        RiskLevel::Low
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "critical" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Lifecycle state. Deserialization is case-insensitive and accepts the
/// `open` and `resolved` aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum RiskStatus {
    #[default]
    Active,
    Monitoring,
    Mitigated,
    Closed,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Monitoring => "Monitoring",
            Self::Mitigated => "Mitigated",
            Self::Closed => "Closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::Monitoring)
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParseWithDefault for RiskStatus {
    fn type_name() -> &'static str {
        "RiskStatus"
    }

    fn default_value() -> Self {
        RiskStatus::Active
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" | "open" => Some(RiskStatus::Active),
            "monitoring" => Some(RiskStatus::Monitoring),
            "mitigated" => Some(RiskStatus::Mitigated),
            "closed" | "resolved" => Some(RiskStatus::Closed),
            _ => None,
        }
    }
}

impl TryFrom<String> for RiskStatus {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::try_parse(&s).ok_or_else(|| format!("unknown risk status '{}'", s))
    }
}

// =============================================================================
// Risk
// =============================================================================

/// A single identified project risk.
///
/// Probability and impact are nominally in `[0, 1]`; percentage inputs
/// (anything above 1) are normalized on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: RiskCategory,
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub impact: f64,
    /// Per-risk score (0-100), derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<RiskLevel>,
    #[serde(default)]
    pub status: RiskStatus,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigation_strategies: Vec<String>,
}

impl Risk {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<RiskCategory>,
        probability: f64,
        impact: f64,
    ) -> Self {
        Self {
            id: String::new(),
            project_id: String::new(),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            probability,
            impact,
            score: None,
            level: None,
            status: RiskStatus::Active,
            mitigation: String::new(),
            mitigation_strategies: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_mitigation(mut self, mitigation: impl Into<String>) -> Self {
        self.mitigation = mitigation.into();
        self
    }

    pub fn with_status(mut self, status: RiskStatus) -> Self {
        self.status = status;
        self
    }

    /// Probability in `[0, 1]`
    pub fn normalized_probability(&self) -> f64 {
        normalize_unit(self.probability)
    }

    /// Impact in `[0, 1]`
    pub fn normalized_impact(&self) -> f64 {
        normalize_unit(self.impact)
    }

    /// Probability x impact on the unit scale
    pub fn exposure(&self) -> f64 {
        self.normalized_probability() * self.normalized_impact()
    }

    /// Per-risk score `round(p * i * 100)`, unweighted
    pub fn raw_score(&self) -> u32 {
        self.score
            .unwrap_or_else(|| (self.exposure() * 100.0).round().clamp(0.0, 100.0) as u32)
    }

    /// All mitigation text, free-form and itemized
    pub fn mitigation_items(&self) -> Vec<&str> {
        let mut items: Vec<&str> = self
            .mitigation_strategies
            .iter()
            .map(String::as_str)
            .collect();
        if !self.mitigation.is_empty() && items.is_empty() {
            items.push(&self.mitigation);
        }
        items
    }
}

/// Values above 1 are treated as percentages. Negative input clamps to 0.
pub fn normalize_unit(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let v = if value > 1.0 { value / 100.0 } else { value };
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip_known_and_unknown() {
        assert_eq!(RiskCategory::from("security"), RiskCategory::Security);
        assert_eq!(
            RiskCategory::from("Financial"),
            RiskCategory::Other("Financial".to_string())
        );

        let json = serde_json::to_string(&RiskCategory::Vendor).unwrap();
        assert_eq!(json, "\"Vendor\"");
        let other: RiskCategory = serde_json::from_str("\"Operational\"").unwrap();
        assert_eq!(other.as_str(), "Operational");
        assert!(!other.is_known());
    }

    #[test]
    fn test_all_categories() {
        let all = RiskCategory::all();
        assert_eq!(all.len(), 12);
        assert!(all.iter().all(RiskCategory::is_known));
    }

    #[test]
    fn test_normalize_percentages() {
        assert_eq!(normalize_unit(0.4), 0.4);
        assert_eq!(normalize_unit(40.0), 0.4);
        assert_eq!(normalize_unit(1.0), 1.0);
        assert_eq!(normalize_unit(-3.0), 0.0);
        assert_eq!(normalize_unit(f64::NAN), 0.0);
    }

    #[test]
    fn test_raw_score() {
        let risk = Risk::new("Vendor lock-in", "Vendor", 0.5, 0.7);
        assert_eq!(risk.raw_score(), 35);

        let percent = Risk::new("Scope creep", "Scope", 50.0, 70.0);
        assert_eq!(percent.raw_score(), 35);
    }

    #[test]
    fn test_deserialize_title_alias() {
        let risk: Risk = serde_json::from_str(
            r#"{"title": "Key staff turnover", "category": "Resource", "probability": 0.3, "impact": 0.6}"#,
        )
        .unwrap();
        assert_eq!(risk.name, "Key staff turnover");
        assert_eq!(risk.status, RiskStatus::Active);
    }

    #[test]
    fn test_deserialize_partial_risk() {
        let risk: Risk = serde_json::from_str(
            r#"{"probability": 0.3, "impact": 0.9, "category": "Security"}"#,
        )
        .unwrap();
        assert!(risk.name.is_empty());
        assert_eq!(risk.category, RiskCategory::Security);
        assert_eq!(risk.raw_score(), 27);

        let bare: Risk = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.category, RiskCategory::Other(String::new()));
        assert_eq!(bare.raw_score(), 0);
    }

    #[test]
    fn test_status_deserialize_is_lenient() {
        let parse = |s: &str| serde_json::from_value::<RiskStatus>(serde_json::json!(s));
        assert_eq!(parse("active").unwrap(), RiskStatus::Active);
        assert_eq!(parse("Open").unwrap(), RiskStatus::Active);
        assert_eq!(parse("MITIGATED").unwrap(), RiskStatus::Mitigated);
        assert_eq!(parse("resolved").unwrap(), RiskStatus::Closed);
        assert!(parse("archived").is_err());

        assert_eq!(serde_json::to_string(&RiskStatus::Monitoring).unwrap(), "\"Monitoring\"");
    }

    #[test]
    fn test_level_ordering_and_parse() {
        assert!(RiskLevel::Low < RiskLevel::Critical);
        assert_eq!(RiskLevel::parse_or_default("HIGH"), RiskLevel::High);
        assert_eq!(RiskLevel::parse_or_default("bogus"), RiskLevel::Low);
        assert!(RiskLevel::Critical.is_elevated());
        assert_eq!(RiskLevel::Low.color(), "#26eb77");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RiskStatus::parse_or_default("resolved"), RiskStatus::Closed);
        assert!(RiskStatus::Monitoring.is_open());
        assert!(!RiskStatus::Mitigated.is_open());
    }
}
