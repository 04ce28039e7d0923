//! Model Output Validation
//!
//! JSON extraction and repair for structured agent outputs.

mod json_repair;

pub use json_repair::{extract_json_from_response, extract_json_with_repair_status, parse_or_raw};
