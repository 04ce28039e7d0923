//! Serve Command
//!
//! Start the web dashboard.

use crate::cli::ui::Output;
use crate::context::AppContext;
use crate::dashboard;
use crate::types::Result;

pub async fn run(bind: Option<String>, port: Option<u16>) -> Result<()> {
    let ctx = AppContext::load()?;
    let dash = &ctx.config.dashboard;
    let address = format!(
        "{}:{}",
        bind.as_deref().unwrap_or(&dash.bind),
        port.unwrap_or(dash.port)
    );

    let out = Output::new();
    out.header("RiskWatch Dashboard");
    out.field("URL:", format!("http://{}", address));
    out.field("Vector store:", ctx.repository.store().name());
    if ctx.llm_enabled() {
        out.field(
            "Agents:",
            format!("{} / {}", ctx.config.llm.provider, ctx.config.llm.model),
        );
    } else {
        out.warning("No language model configured; the chat assistant is unavailable");
    }
    println!();

    dashboard::serve(ctx, Some(address)).await
}
