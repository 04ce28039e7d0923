//! Generated project snapshots for the dashboard and agent tools.
//!
//! Every snapshot is derived from a seeded RNG so one project always yields
//! the same risk register within a process. Snapshots are cached per
//! `(project, days_back)` for the configured refresh interval.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::DataConfig;
use crate::constants::projects::{ALL_PROJECTS, DEFAULT_PROJECTS};
use crate::risk::charts::{CategoryCount, LevelCount, category_distribution, level_distribution};
use crate::risk::{RiskScorer, TrendPoint, percent_change};
use crate::storage::TtlCache;
use crate::types::{Result, Risk, RiskError, RiskLevel, RiskStatus};

/// Longest history a snapshot will generate
const MAX_HISTORY_DAYS: u32 = 365;

/// Market conditions attached to a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub industry_trends: Vec<String>,
    pub economic_indicators: BTreeMap<String, f64>,
    pub competitor_activities: Vec<String>,
    pub regulatory_changes: Vec<String>,
    pub technology_trends: Vec<String>,
    pub market_risk_impact: String,
}

/// Everything the dashboard and the tools know about one project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSnapshot {
    pub name: String,
    pub status: String,
    pub completion_percentage: u32,
    pub budget_status: String,
    pub resource_utilization: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub key_metrics: BTreeMap<String, f64>,
    pub risks: Vec<Risk>,
    pub trend_data: Vec<TrendPoint>,
    pub risk_by_category: Vec<CategoryCount>,
    pub risk_by_level: Vec<LevelCount>,
    /// Percent change across the trend window
    pub risk_trend: f64,
    /// Share of risks mitigated or closed, in percent
    pub mitigation_rate: f64,
    pub overall_score: u32,
    pub overall_level: RiskLevel,
    pub market_data: MarketSnapshot,
}

impl ProjectSnapshot {
    pub fn count_at(&self, level: RiskLevel) -> usize {
        self.risks.iter().filter(|r| r.level == Some(level)).count()
    }

    /// High and Critical together
    pub fn high_risk_count(&self) -> usize {
        self.risks
            .iter()
            .filter(|r| r.level.is_some_and(|l| l.is_elevated()))
            .count()
    }
}

// (title, description, category, mitigation strategies)
type RiskTemplate = (&'static str, &'static str, &'static str, [&'static str; 3]);

const RISK_TEMPLATES: [RiskTemplate; 14] = [
    (
        "Key Staff Turnover",
        "Loss of senior engineers during critical delivery phases",
        "Resource",
        [
            "Document critical knowledge in shared runbooks",
            "Cross-train team members on key components",
            "Introduce retention incentives for critical roles",
        ],
    ),
    (
        "Milestone Slippage",
        "Integration milestones trending later than the baseline plan",
        "Schedule",
        [
            "Re-baseline the plan with realistic estimates",
            "Add schedule buffer before integration milestones",
            "Track critical path weekly with the steering committee",
        ],
    ),
    (
        "Cost Overrun",
        "Actual spend running ahead of the approved budget",
        "Budget",
        [
            "Introduce weekly budget reviews",
            "Require approval for unplanned spend above threshold",
            "Renegotiate rates with high-cost vendors",
        ],
    ),
    (
        "Legacy Integration Failure",
        "Interfaces to legacy systems behave differently than documented",
        "Technical",
        [
            "Build integration test harnesses early",
            "Engage legacy system owners in design reviews",
            "Plan fallback adapters for unstable interfaces",
        ],
    ),
    (
        "Performance Degradation",
        "System response times exceed agreed service levels under load",
        "Technical",
        [
            "Run load tests before each release",
            "Define performance budgets per component",
            "Provision autoscaling for peak periods",
        ],
    ),
    (
        "Defect Backlog Growth",
        "Open defects accumulating faster than they are resolved",
        "Quality",
        [
            "Reserve sprint capacity for defect reduction",
            "Strengthen automated regression coverage",
            "Hold weekly triage with product owners",
        ],
    ),
    (
        "Scope Creep",
        "Stakeholders adding requirements outside the agreed scope",
        "Scope",
        [
            "Enforce a formal change request process",
            "Re-prioritize backlog against business value",
            "Communicate scope trade-offs to sponsors",
        ],
    ),
    (
        "Stakeholder Misalignment",
        "Business units disagree on priorities and acceptance criteria",
        "Communication",
        [
            "Hold regular steering committee reviews",
            "Publish a shared decision log",
            "Agree acceptance criteria before build starts",
        ],
    ),
    (
        "Supply Chain Disruption",
        "External supply issues delaying hardware and licences",
        "External",
        [
            "Identify alternative suppliers",
            "Order long-lead items early",
            "Hold contingency stock for critical parts",
        ],
    ),
    (
        "Vendor Underperformance",
        "Third-party vendor missing delivery commitments",
        "Vendor",
        [
            "Add penalty clauses and service credits",
            "Schedule fortnightly vendor performance reviews",
            "Prepare a secondary vendor for critical work",
        ],
    ),
    (
        "Regulatory Non-Compliance",
        "Solution may not satisfy new data protection requirements",
        "Regulatory",
        [
            "Engage compliance experts in design reviews",
            "Run a data protection impact assessment",
            "Track regulatory changes with legal counsel",
        ],
    ),
    (
        "Market Demand Shift",
        "Changing customer demand reduces the expected project value",
        "Market",
        [
            "Validate assumptions with customer research",
            "Deliver in smaller increments to test demand",
            "Review the business case quarterly",
        ],
    ),
    (
        "Data Breach",
        "Sensitive data exposed through misconfigured access controls",
        "Security",
        [
            "Encrypt data at rest and in transit",
            "Run penetration tests before go-live",
            "Apply least-privilege access reviews",
        ],
    ),
    (
        "Third-Party Library Vulnerability",
        "Critical vulnerability disclosed in a core dependency",
        "Security",
        [
            "Automate dependency vulnerability scanning",
            "Keep a patch window in every sprint",
            "Maintain a software bill of materials",
        ],
    ),
];

const PROJECT_STATUSES: [&str; 4] = ["Planning", "In Progress", "In Progress", "On Hold"];
const BUDGET_STATUSES: [&str; 3] = ["Under Budget", "On Budget", "Over Budget"];
const RISK_STATUSES: [RiskStatus; 5] = [
    RiskStatus::Active,
    RiskStatus::Active,
    RiskStatus::Monitoring,
    RiskStatus::Mitigated,
    RiskStatus::Closed,
];
const MARKET_IMPACTS: [&str; 3] = ["Low", "Medium", "High"];

const INDUSTRY_TRENDS: [&str; 6] = [
    "Cloud adoption accelerating across mid-size enterprises",
    "Consolidation among managed service providers",
    "Shift toward subscription licensing models",
    "Increased outsourcing of infrastructure operations",
    "Growing demand for real-time analytics platforms",
    "Rising investment in cybersecurity tooling",
];
const COMPETITOR_ACTIVITIES: [&str; 4] = [
    "Competitor launched a comparable platform at lower price",
    "Major competitor acquired a niche analytics vendor",
    "New entrant targeting the same customer segment",
    "Competitor announced delays to its flagship release",
];
const REGULATORY_CHANGES: [&str; 4] = [
    "Updated data residency requirements announced",
    "New accessibility standards for customer-facing apps",
    "Stricter breach notification deadlines proposed",
    "Revised financial reporting rules for IT capital spend",
];
const TECHNOLOGY_TRENDS: [&str; 5] = [
    "Generative AI features entering enterprise software",
    "Serverless architectures reducing operational overhead",
    "Zero-trust networking becoming the default posture",
    "Container platforms standardizing on Kubernetes",
    "Low-code tooling adopted for internal applications",
];

/// Source of generated project data
pub struct ProjectDataService {
    cache: TtlCache<(String, u32), Arc<ProjectSnapshot>>,
    salt: u64,
    scorer: RiskScorer,
}

impl ProjectDataService {
    pub fn new(config: &DataConfig, scorer: RiskScorer) -> Self {
        Self {
            cache: TtlCache::new(Duration::from_secs(config.refresh_interval_secs)),
            salt: config.seed.unwrap_or_else(rand::random),
            scorer,
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Project names offered for selection, "All Projects" first
    pub fn project_names(&self) -> Vec<&'static str> {
        std::iter::once(ALL_PROJECTS)
            .chain(DEFAULT_PROJECTS.iter().copied())
            .collect()
    }

    /// Snapshot for `project` covering the last `days_back` days
    pub fn get_project_data(&self, project: &str, days_back: u32) -> Result<Arc<ProjectSnapshot>> {
        let project = project.trim();
        if project.is_empty() {
            return Err(RiskError::Validation("Project name is required".to_string()));
        }
        if days_back == 0 || days_back > MAX_HISTORY_DAYS {
            return Err(RiskError::Validation(format!(
                "days_back must be between 1 and {}, got {}",
                MAX_HISTORY_DAYS, days_back
            )));
        }

        let key = (project.to_string(), days_back);
        if let Some(snapshot) = self.cache.get(&key) {
            return Ok(snapshot);
        }

        let snapshot = if project == ALL_PROJECTS {
            let parts = DEFAULT_PROJECTS
                .iter()
                .map(|name| self.get_project_data(name, days_back))
                .collect::<Result<Vec<_>>>()?;
            self.aggregate(&parts, days_back)
        } else {
            self.generate(project, days_back)
        };

        debug!(
            "Generated snapshot for '{}' ({} days, {} risks)",
            project,
            days_back,
            snapshot.risks.len()
        );
        let snapshot = Arc::new(snapshot);
        self.cache.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop cached snapshots so the next read regenerates them
    pub fn refresh(&self) {
        self.cache.clear();
    }

    fn rng_for(&self, project: &str) -> StdRng {
        let digest = Sha256::digest(project.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        StdRng::seed_from_u64(u64::from_le_bytes(bytes) ^ self.salt)
    }

    fn generate(&self, project: &str, days_back: u32) -> ProjectSnapshot {
        let mut rng = self.rng_for(project);
        let today = Utc::now().date_naive();
        let slug = slugify(project);

        let risks = self.generate_risks(&mut rng, &slug);
        let summary = self.scorer.score(&risks);
        let market_data = generate_market(&mut rng);

        let start_date = today - ChronoDuration::days(rng.random_range(60..240));
        let end_date = today + ChronoDuration::days(rng.random_range(30..300));

        let mut key_metrics = BTreeMap::new();
        key_metrics.insert(
            "cost_performance_index".to_string(),
            round2(rng.random_range(0.75..1.15)),
        );
        key_metrics.insert(
            "schedule_performance_index".to_string(),
            round2(rng.random_range(0.7..1.1)),
        );
        key_metrics.insert(
            "open_issues".to_string(),
            rng.random_range(0..40) as f64,
        );
        key_metrics.insert(
            "change_requests".to_string(),
            rng.random_range(0..15) as f64,
        );

        let status = choose(&mut rng, &PROJECT_STATUSES);
        let completion_percentage = rng.random_range(5..95);
        let budget_status = choose(&mut rng, &BUDGET_STATUSES);
        let resource_utilization = rng.random_range(60..=100);

        // trend is generated last so the register stays stable across windows
        let trend_data = random_walk(&mut rng, today, days_back, summary.score as f64);

        self.assemble(AssembleParts {
            name: project.to_string(),
            status: status.to_string(),
            completion_percentage,
            budget_status: budget_status.to_string(),
            resource_utilization,
            start_date,
            end_date,
            key_metrics,
            risks,
            trend_data,
            market_data,
        })
    }

    fn generate_risks(&self, rng: &mut StdRng, slug: &str) -> Vec<Risk> {
        let count = rng.random_range(5..=9);
        let templates: Vec<&RiskTemplate> = RISK_TEMPLATES.choose_multiple(rng, count).collect();

        templates
            .into_iter()
            .enumerate()
            .map(|(i, (title, description, category, strategies))| {
                let probability = round2(rng.random_range(0.1..0.95));
                let impact = round2(rng.random_range(0.1..0.95));
                let status = *choose(rng, &RISK_STATUSES);

                let mut risk = Risk::new(*title, *category, probability, impact)
                    .with_id(format!("{}-r{}", slug, i + 1))
                    .with_project(slug)
                    .with_description(*description)
                    .with_status(status);
                risk.mitigation_strategies = strategies.iter().map(|s| s.to_string()).collect();
                let score = risk.raw_score();
                risk.score = Some(score);
                risk.level = Some(self.scorer.level_for(score));
                risk
            })
            .collect()
    }

    fn aggregate(&self, parts: &[Arc<ProjectSnapshot>], days_back: u32) -> ProjectSnapshot {
        let mut rng = self.rng_for(ALL_PROJECTS);
        let n = parts.len().max(1);

        let risks: Vec<Risk> = parts.iter().flat_map(|p| p.risks.iter().cloned()).collect();

        let mut trend_data: Vec<TrendPoint> = Vec::new();
        if let Some(first) = parts.first() {
            for (i, point) in first.trend_data.iter().enumerate() {
                let total: f64 = parts
                    .iter()
                    .filter_map(|p| p.trend_data.get(i))
                    .map(|p| p.risk_score)
                    .sum();
                trend_data.push(TrendPoint {
                    date: point.date,
                    risk_score: round1(total / n as f64),
                });
            }
        }
        if trend_data.is_empty() {
            let today = Utc::now().date_naive();
            trend_data = random_walk(&mut rng, today, days_back, 0.0);
        }

        let mut key_metrics: BTreeMap<String, f64> = BTreeMap::new();
        for part in parts {
            for (k, v) in &part.key_metrics {
                *key_metrics.entry(k.clone()).or_default() += v / n as f64;
            }
        }
        for value in key_metrics.values_mut() {
            *value = round2(*value);
        }

        let over_budget = parts
            .iter()
            .filter(|p| p.budget_status == "Over Budget")
            .count();
        let budget_status = if over_budget * 2 > parts.len() {
            "Over Budget"
        } else if over_budget > 0 {
            "Mixed"
        } else {
            "On Budget"
        };

        let today = Utc::now().date_naive();
        self.assemble(AssembleParts {
            name: ALL_PROJECTS.to_string(),
            status: "Portfolio".to_string(),
            completion_percentage: (parts
                .iter()
                .map(|p| p.completion_percentage)
                .sum::<u32>() as usize
                / n) as u32,
            budget_status: budget_status.to_string(),
            resource_utilization: (parts
                .iter()
                .map(|p| p.resource_utilization)
                .sum::<u32>() as usize
                / n) as u32,
            start_date: parts.iter().map(|p| p.start_date).min().unwrap_or(today),
            end_date: parts.iter().map(|p| p.end_date).max().unwrap_or(today),
            key_metrics,
            risks,
            trend_data,
            market_data: generate_market(&mut rng),
        })
    }

    fn assemble(&self, parts: AssembleParts) -> ProjectSnapshot {
        let thresholds = self.scorer.thresholds();
        let summary = self.scorer.score(&parts.risks);

        let risk_trend = match (parts.trend_data.first(), parts.trend_data.last()) {
            (Some(first), Some(last)) => round1(percent_change(first.risk_score, last.risk_score)),
            _ => 0.0,
        };

        ProjectSnapshot {
            risk_by_category: category_distribution(&parts.risks, thresholds),
            risk_by_level: level_distribution(&parts.risks, thresholds),
            mitigation_rate: mitigation_rate(&parts.risks),
            risk_trend,
            overall_score: summary.score,
            overall_level: summary.level,
            name: parts.name,
            status: parts.status,
            completion_percentage: parts.completion_percentage,
            budget_status: parts.budget_status,
            resource_utilization: parts.resource_utilization,
            start_date: parts.start_date,
            end_date: parts.end_date,
            key_metrics: parts.key_metrics,
            risks: parts.risks,
            trend_data: parts.trend_data,
            market_data: parts.market_data,
        }
    }
}

struct AssembleParts {
    name: String,
    status: String,
    completion_percentage: u32,
    budget_status: String,
    resource_utilization: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    key_metrics: BTreeMap<String, f64>,
    risks: Vec<Risk>,
    trend_data: Vec<TrendPoint>,
    market_data: MarketSnapshot,
}

/// Percentage of risks that are mitigated or closed
pub fn mitigation_rate(risks: &[Risk]) -> f64 {
    if risks.is_empty() {
        return 0.0;
    }
    let handled = risks.iter().filter(|r| !r.status.is_open()).count();
    round1(handled as f64 / risks.len() as f64 * 100.0)
}

/// `days` daily points ending today at `current`, walked backwards
fn random_walk(rng: &mut StdRng, today: NaiveDate, days: u32, current: f64) -> Vec<TrendPoint> {
    let mut points = Vec::with_capacity(days as usize);
    let mut score = current;
    for offset in 0..days {
        points.push(TrendPoint {
            date: today - ChronoDuration::days(offset as i64),
            risk_score: round1(score),
        });
        score = (score - rng.random_range(-3.0..3.0)).clamp(0.0, 100.0);
    }
    points.reverse();
    points
}

fn generate_market(rng: &mut StdRng) -> MarketSnapshot {
    let mut economic_indicators = BTreeMap::new();
    economic_indicators.insert("inflation_rate".to_string(), round1(rng.random_range(1.5..6.0)));
    economic_indicators.insert("interest_rate".to_string(), round1(rng.random_range(2.0..7.0)));
    economic_indicators.insert("gdp_growth".to_string(), round1(rng.random_range(-1.0..4.0)));
    economic_indicators.insert(
        "it_spending_growth".to_string(),
        round1(rng.random_range(-2.0..10.0)),
    );

    let competitors = rng.random_range(1..=2);
    MarketSnapshot {
        industry_trends: pick(rng, &INDUSTRY_TRENDS, 2),
        economic_indicators,
        competitor_activities: pick(rng, &COMPETITOR_ACTIVITIES, competitors),
        regulatory_changes: pick(rng, &REGULATORY_CHANGES, 1),
        technology_trends: pick(rng, &TECHNOLOGY_TRENDS, 2),
        market_risk_impact: choose(rng, &MARKET_IMPACTS).to_string(),
    }
}

fn pick(rng: &mut StdRng, pool: &[&str], count: usize) -> Vec<String> {
    pool.choose_multiple(rng, count)
        .map(|s| s.to_string())
        .collect()
}

fn choose<'a, T>(rng: &mut StdRng, pool: &'a [T]) -> &'a T {
    // pools are non-empty constants
    pool.choose(rng).unwrap_or(&pool[0])
}

/// Lowercase identifier with non-alphanumerics collapsed to `_`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
