//! CSV export of risk registers.

use chrono::NaiveDate;

use super::scoring::RiskThresholds;
use crate::types::{Result, Risk, RiskError};

const HEADERS: [&str; 10] = [
    "id",
    "title",
    "category",
    "probability",
    "impact",
    "score",
    "level",
    "status",
    "description",
    "mitigation",
];

/// Download name, e.g. `risk_report_cloud_migration_20250301.csv`
pub fn csv_filename(project_name: &str, date: NaiveDate) -> String {
    format!(
        "risk_report_{}_{}.csv",
        project_name.replace(' ', "_").to_lowercase(),
        date.format("%Y%m%d")
    )
}

/// One row per risk. Itemized mitigation strategies are joined with `; `.
pub fn risks_to_csv(risks: &[Risk], thresholds: &RiskThresholds) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for risk in risks {
        let score = risk.raw_score();
        let level = risk.level.unwrap_or_else(|| thresholds.level_for(score));
        writer.write_record([
            risk.id.clone(),
            risk.name.clone(),
            risk.category.to_string(),
            format!("{:.2}", risk.normalized_probability()),
            format!("{:.2}", risk.normalized_impact()),
            score.to_string(),
            level.to_string(),
            risk.status.as_str().to_string(),
            risk.description.clone(),
            risk.mitigation_items().join("; "),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RiskError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| RiskError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    #[test]
    fn test_filename_uses_lowercase_underscores() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(
            csv_filename("Cloud Migration", date),
            "risk_report_cloud_migration_20250301.csv"
        );
        assert_eq!(
            csv_filename("All Projects", date),
            "risk_report_all_projects_20250301.csv"
        );
    }

    #[test]
    fn test_rows_follow_header() {
        let mut risk = Risk::new("Vendor lock-in, long term", "Vendor", 0.6, 0.5)
            .with_id("r1")
            .with_mitigation("Negotiate exit clauses");
        risk.level = Some(RiskLevel::Medium);

        let csv = risks_to_csv(&[risk], &RiskThresholds::default()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,title,category,probability,impact,score,level,status,description,mitigation"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("r1,\"Vendor lock-in, long term\",Vendor,0.60,0.50,30,Medium,"));
        assert!(row.ends_with("Negotiate exit clauses"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty_register_has_header_only() {
        let csv = risks_to_csv(&[], &RiskThresholds::default()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
