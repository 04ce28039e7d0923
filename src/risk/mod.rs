//! Risk Analytics
//!
//! Pure functions over risk records:
//! - Weighted aggregate score and level bucketing
//! - Trend detection over score history
//! - Markdown reports and summaries
//! - Chart payloads for the dashboard
//! - CSV export

pub mod charts;
mod export;
mod report;
mod scoring;
mod trend;

pub use export::{csv_filename, risks_to_csv};
pub use report::{format_risk_report, format_risk_report_at, generate_risk_report_summary};
pub use scoring::{
    CategoryWeights, RiskScorer, RiskThresholds, ScoreSummary, calculate_risk_score,
    get_risk_level, weighted_contribution,
};
pub use trend::{
    TrendAnalysis, TrendDirection, TrendPoint, analyze_trend, analyze_trend_with_threshold,
    percent_change,
};
