//! Score Command
//!
//! Print the aggregate risk score, level breakdown and trend for a project.

use crate::cli::ui::Output;
use crate::context::AppContext;
use crate::risk::analyze_trend;
use crate::types::{Result, RiskLevel};

pub async fn run(project: &str, days: Option<u32>, format: &str) -> Result<()> {
    let ctx = AppContext::load()?;
    let days = days.unwrap_or(ctx.config.dashboard.default_days_back);
    let snapshot = ctx.data.get_project_data(project, days)?;
    let trend = analyze_trend(&snapshot.trend_data);

    if format == "json" {
        let body = serde_json::json!({
            "project": snapshot.name,
            "days_back": days,
            "overall_score": snapshot.overall_score,
            "overall_level": snapshot.overall_level,
            "total_risks": snapshot.risks.len(),
            "high_risks": snapshot.high_risk_count(),
            "levels": snapshot.risk_by_level,
            "mitigation_rate": snapshot.mitigation_rate,
            "trend": trend,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Risk Score: {}", snapshot.name));
    out.field(
        "Overall:",
        format!(
            "{}/100 ({})",
            snapshot.overall_score,
            out.level(snapshot.overall_level)
        ),
    );
    out.field("Status:", &snapshot.status);
    out.field("Total risks:", snapshot.risks.len());
    out.field("High risks:", snapshot.high_risk_count());
    out.field("Mitigation rate:", format!("{:.1}%", snapshot.mitigation_rate));
    out.field(
        "Trend:",
        format!(
            "{:+.1}% over {} days ({})",
            snapshot.risk_trend,
            days,
            trend.direction.as_str()
        ),
    );

    out.section("By level");
    for level in RiskLevel::ALL.iter().rev() {
        out.field(&out.level(*level), snapshot.count_at(*level));
    }
    Ok(())
}
