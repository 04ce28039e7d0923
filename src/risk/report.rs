//! Markdown risk reports.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use super::scoring::RiskThresholds;
use crate::constants::risk::MITIGATION_PRIORITY_PRODUCT;
use crate::types::{Risk, format_timestamp};

const NO_MITIGATION: &str = "No mitigation strategy provided.";
const NO_PRIORITY_RISKS: &str = "No high-priority risks requiring immediate mitigation.";
const SUMMARY_TOP_RISKS: usize = 3;

/// Full markdown report for a project, stamped with the current time.
pub fn format_risk_report(project_name: &str, risks: &[Risk], overall_score: u32) -> String {
    format_risk_report_at(
        project_name,
        risks,
        overall_score,
        &RiskThresholds::default(),
        Utc::now(),
    )
}

pub fn format_risk_report_at(
    project_name: &str,
    risks: &[Risk],
    overall_score: u32,
    thresholds: &RiskThresholds,
    generated_at: DateTime<Utc>,
) -> String {
    let level = thresholds.level_for(overall_score);
    let mut out = String::new();

    let _ = write!(out, "# Risk Report: {}\n\n", project_name);
    let _ = write!(
        out,
        "**Overall Risk Score:** {}/100 ({})\n\n",
        overall_score,
        level.as_str().to_uppercase()
    );
    let _ = write!(
        out,
        "**Report Generated:** {}\n\n",
        format_timestamp(generated_at)
    );

    out.push_str("## Risk Summary by Category\n\n");
    for (category, members) in group_by_category(risks) {
        let _ = write!(out, "### {}\n\n", category);
        out.push_str("| Risk | Probability | Impact | Score | Status |\n");
        out.push_str("|------|------------|--------|-------|--------|\n");
        for risk in members {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                risk.name,
                percent(risk.normalized_probability()),
                percent(risk.normalized_impact()),
                exposure_score(risk),
                risk.status
            );
        }
        out.push('\n');
    }

    out.push_str("## Mitigation Strategies\n\n");
    let priority: Vec<&Risk> = risks
        .iter()
        .filter(|r| r.exposure() > MITIGATION_PRIORITY_PRODUCT)
        .collect();

    if priority.is_empty() {
        let _ = write!(out, "{}\n\n", NO_PRIORITY_RISKS);
    } else {
        for risk in priority {
            let _ = write!(out, "### {}\n\n{}\n\n", risk.name, mitigation_text(risk));
        }
    }

    out
}

/// Short markdown digest shown above the risk list.
pub fn generate_risk_report_summary(
    project_name: &str,
    risks: &[Risk],
    thresholds: &RiskThresholds,
) -> String {
    if risks.is_empty() {
        return format!(
            "### Risk Summary: {}\n\nNo risks match the current filters.\n",
            project_name
        );
    }

    let elevated = risks
        .iter()
        .filter(|r| thresholds.level_for(exposure_score(r)).is_elevated())
        .count();
    let open = risks.iter().filter(|r| r.status.is_open()).count();
    let average =
        risks.iter().map(|r| exposure_score(r) as f64).sum::<f64>() / risks.len() as f64;

    let mut ranked: Vec<&Risk> = risks.iter().collect();
    ranked.sort_by(|a, b| b.exposure().total_cmp(&a.exposure()));

    let mut out = format!("### Risk Summary: {}\n\n", project_name);
    let _ = writeln!(out, "- **Total risks:** {}", risks.len());
    let _ = writeln!(out, "- **High or critical:** {}", elevated);
    let _ = writeln!(out, "- **Open:** {}", open);
    let _ = write!(out, "- **Average risk score:** {:.1}\n\n", average);

    out.push_str("**Top risks:**\n\n");
    for (i, risk) in ranked.iter().take(SUMMARY_TOP_RISKS).enumerate() {
        let score = exposure_score(risk);
        let _ = writeln!(
            out,
            "{}. {} ({}, {} risk, score {})",
            i + 1,
            risk.name,
            risk.category,
            thresholds.level_for(score),
            score
        );
    }

    out
}

/// Unweighted per-risk score `round(p * i * 100)`
fn exposure_score(risk: &Risk) -> u32 {
    (risk.exposure() * 100.0).round() as u32
}

fn percent(unit: f64) -> String {
    format!("{:.0}%", unit * 100.0)
}

fn mitigation_text(risk: &Risk) -> String {
    match risk.mitigation_items().as_slice() {
        [] => NO_MITIGATION.to_string(),
        [single] => single.to_string(),
        many => many
            .iter()
            .map(|m| format!("- {}", m))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Groups in order of first appearance
fn group_by_category(risks: &[Risk]) -> Vec<(&str, Vec<&Risk>)> {
    let mut groups: Vec<(&str, Vec<&Risk>)> = Vec::new();
    for risk in risks {
        let label = risk.category.as_str();
        match groups.iter_mut().find(|(c, _)| *c == label) {
            Some((_, members)) => members.push(risk),
            None => groups.push((label, vec![risk])),
        }
    }
    groups
}
