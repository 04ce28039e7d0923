//! Report Command
//!
//! Render a project's risk report as markdown or CSV, to stdout or a file.

use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::cli::ui::Output;
use crate::context::AppContext;
use crate::risk::{csv_filename, format_risk_report_at, risks_to_csv};
use crate::types::Result;

pub struct ReportOptions {
    pub project: String,
    pub days: Option<u32>,
    /// `markdown` or `csv`
    pub format: String,
    pub output: Option<PathBuf>,
}

pub async fn run(options: ReportOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let days = options
        .days
        .unwrap_or(ctx.config.dashboard.default_days_back);
    let snapshot = ctx.data.get_project_data(&options.project, days)?;
    let thresholds = ctx.data.scorer().thresholds();
    let now = Utc::now();

    let (content, default_name) = if options.format == "csv" {
        (
            risks_to_csv(&snapshot.risks, thresholds)?,
            csv_filename(&options.project, now.date_naive()),
        )
    } else {
        (
            format_risk_report_at(
                &options.project,
                &snapshot.risks,
                snapshot.overall_score,
                thresholds,
                now,
            ),
            String::new(),
        )
    };

    match options.output {
        Some(path) => {
            let path = if path.is_dir() && !default_name.is_empty() {
                path.join(default_name)
            } else {
                path
            };
            std::fs::write(&path, &content)?;
            info!("Report for '{}' written to {}", options.project, path.display());
            Output::new().success(&format!("Report written to {}", path.display()));
        }
        None => print!("{}", content),
    }
    Ok(())
}
