//! Status Command
//!
//! Display configuration, backends and stored document counts.

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::context::AppContext;
use crate::types::Result;

pub async fn run(format: &str) -> Result<()> {
    let ctx = AppContext::load()?;
    let counts = ctx.repository.collection_counts().await;
    let history = ctx.chat.load().len();

    if format == "json" {
        let collections: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(name, n)| (name.to_string(), (*n).into()))
            .collect();
        let status = serde_json::json!({
            "project_initialized": ConfigLoader::is_project_initialized(),
            "llm": {
                "enabled": ctx.llm_enabled(),
                "provider": ctx.config.llm.provider,
                "model": ctx.config.llm.model,
            },
            "vector_store": ctx.repository.store().name(),
            "collections": collections,
            "chat_history": history,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let out = Output::new();
    out.header("RiskWatch Status");
    out.field(
        "Project config:",
        if ConfigLoader::is_project_initialized() {
            "initialized"
        } else {
            "not initialized"
        },
    );
    if ctx.llm_enabled() {
        out.field(
            "LLM:",
            format!("{} / {}", ctx.config.llm.provider, ctx.config.llm.model),
        );
    } else {
        out.field("LLM:", "disabled");
    }
    out.field("Embeddings:", format!("{:?}", ctx.config.embedding.provider));
    out.field("Vector store:", ctx.repository.store().name());
    out.field("Chat history:", format!("{} messages", history));

    out.section("Collections");
    for (name, n) in counts {
        out.field(name, n);
    }
    Ok(())
}
