//! Chat Command
//!
//! Ask the agent crew a question from the terminal. The exchange is
//! appended to the same history the dashboard shows.

use crate::cli::ui::Output;
use crate::context::AppContext;
use crate::types::Result;

pub async fn run(message: &str, project: &str, format: &str) -> Result<()> {
    let ctx = AppContext::load()?;
    let out = Output::new();

    if !ctx.llm_enabled() {
        out.warning("No language model configured. Set [llm] provider in the config.");
    } else if format != "json" {
        out.info(&format!("Running risk analysis for '{}'...", project));
    }

    let (reply, history) = ctx.converse(message, project).await?;

    if format == "json" {
        let body = serde_json::json!({
            "project": project,
            "question": message,
            "reply": reply,
            "history_length": history.len(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        out.section("Assistant");
        println!("{}", reply);
    }
    Ok(())
}
