//! Seed Command
//!
//! Load the sample projects, risks and market data into the vector store.

use crate::cli::ui::Output;
use crate::context::AppContext;
use crate::data::sample_dataset;
use crate::types::Result;

pub async fn run() -> Result<()> {
    let ctx = AppContext::load()?;
    let out = Output::new();

    if !ctx.repository.is_enabled() {
        out.warning("Vector store is disabled; nothing to seed");
        return Ok(());
    }

    let summary = ctx
        .repository
        .populate_sample_data(&sample_dataset())
        .await?;

    out.success(&format!(
        "Seeded {} projects, {} risks and {} market entries into {}",
        summary.projects,
        summary.risks,
        summary.market_data,
        ctx.repository.store().name()
    ));
    Ok(())
}
