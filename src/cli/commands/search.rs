//! Search Command
//!
//! Similarity search over stored risks.

use crate::cli::ui::Output;
use crate::constants::projects::ALL_PROJECTS;
use crate::context::AppContext;
use crate::types::Result;

pub async fn run(query: &str, project: Option<&str>, limit: usize, format: &str) -> Result<()> {
    let ctx = AppContext::load()?;
    let scope = match project.filter(|p| *p != ALL_PROJECTS) {
        Some(name) => Some(ctx.repository.resolve_project_id(name).await),
        None => None,
    };
    let risks = ctx
        .repository
        .query_risks(query, scope.as_deref(), limit)
        .await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&risks)?);
        return Ok(());
    }

    let out = Output::new();
    if risks.is_empty() {
        out.warning("No matching risks found");
        if !ctx.repository.is_enabled() {
            out.info("The vector store is disabled");
        } else {
            out.info("Run 'riskwatch seed' to load the sample risks");
        }
        return Ok(());
    }

    out.header(&format!("{} risks matching '{}'", risks.len(), query));
    let scorer = ctx.data.scorer();
    for risk in &risks {
        let level = scorer.risk_level(risk);
        println!(
            "\n{} {} [{}]",
            out.level(level),
            risk.name,
            risk.category
        );
        out.field("Project:", &risk.project_id);
        out.field("Score:", risk.raw_score());
        if !risk.description.is_empty() {
            out.field("Description:", &risk.description);
        }
    }
    Ok(())
}
