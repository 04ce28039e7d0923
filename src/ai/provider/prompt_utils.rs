//! JSON output instructions appended to prompts when a schema is requested.

use serde_json::Value;
use tracing::warn;

/// Instruction block describing `schema`, or `None` for free-text requests
pub fn schema_instructions(schema: &Value) -> Option<String> {
    if schema.is_null() {
        return None;
    }
    let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|e| {
        warn!("Failed to pretty-print schema, using compact form: {}", e);
        schema.to_string()
    });
    Some(format!(
        "Respond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        rendered
    ))
}

/// `prompt` followed by the schema instructions, if any
pub fn build_schema_prompt(prompt: &str, schema: &Value) -> String {
    match schema_instructions(schema) {
        Some(instructions) => format!("{}\n\n---\n\n{}", prompt, instructions),
        None => prompt.to_string(),
    }
}
