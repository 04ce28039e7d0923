//! JSON Extraction and Repair
//!
//! Models asked for JSON still answer with fenced blocks, a sentence of
//! preamble, trailing commas, or output cut off at the token limit. Each
//! repair pass is applied only when the previous, gentler one failed.

use serde_json::{Value, json};
use tracing::debug;

use crate::types::{Result, RiskError, truncate_chars};

/// Parse JSON out of a model completion, repairing common defects.
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    extract_json_with_repair_status(content).map(|(value, _)| value)
}

/// Like [`extract_json_from_response`], also reporting whether repair was needed
pub fn extract_json_with_repair_status(content: &str) -> Result<(Value, bool)> {
    let cleaned = strip_code_fences(content.trim().trim_start_matches('\u{feff}'));

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok((value, false));
    }

    let candidate = embedded_json(&cleaned).unwrap_or(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        debug!("JSON extracted from surrounding text");
        return Ok((value, true));
    }

    for pass in RepairPass::ALL {
        let repaired = pass.apply(candidate);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            debug!("JSON repaired by {:?} pass", pass);
            return Ok((value, true));
        }
    }

    Err(RiskError::Validation(format!(
        "Response is not valid JSON: {}",
        truncate_chars(&cleaned, 200)
    )))
}

/// Parsed JSON, or `{"error", "raw_output"}` carrying the text that failed
pub fn parse_or_raw(content: &str) -> Value {
    match extract_json_from_response(content) {
        Ok(value) => value,
        Err(e) => json!({
            "error": format!("Failed to parse JSON: {}", e),
            "raw_output": content,
        }),
    }
}

#[derive(Debug, Clone, Copy)]
enum RepairPass {
    TrailingCommas,
    CloseOpen,
    Aggressive,
}

impl RepairPass {
    const ALL: [RepairPass; 3] = [Self::TrailingCommas, Self::CloseOpen, Self::Aggressive];

    fn apply(self, s: &str) -> String {
        match self {
            Self::TrailingCommas => remove_trailing_commas(s),
            Self::CloseOpen => close_open_structures(&remove_trailing_commas(s)),
            Self::Aggressive => {
                let stripped: String = s
                    .chars()
                    .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
                    .collect();
                let closed = close_open_structures(&remove_trailing_commas(
                    &close_strings_at_newline(&stripped),
                ));
                // the close step can leave a dangling comma before the new closers
                remove_trailing_commas(&closed)
            }
        }
    }
}

/// Drop a surrounding ```json fence, wherever the fenced block sits.
fn strip_code_fences(s: &str) -> String {
    let Some(open) = s.find("```") else {
        return s.to_string();
    };
    let after_open = &s[open + 3..];
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    let body = body.rfind("```").map(|end| &body[..end]).unwrap_or(body);
    body.trim().to_string()
}

/// Tracks whether the scanner is inside a string literal
#[derive(Default)]
struct Scanner {
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Feed one char; returns true when it is structural (outside a string)
    fn structural(&mut self, ch: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        match ch {
            '\\' if self.in_string => {
                self.escaped = true;
                false
            }
            '"' => {
                self.in_string = !self.in_string;
                false
            }
            _ => !self.in_string,
        }
    }
}

/// First balanced `{...}` or `[...]` span in the text
fn embedded_json(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut scanner = Scanner::default();
    let mut stack = Vec::new();

    for (i, ch) in s[start..].char_indices() {
        if !scanner.structural(ch) {
            continue;
        }
        match ch {
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                stack.pop();
                if stack.is_empty() {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    // unbalanced: hand the tail to the repair passes
    Some(&s[start..])
}

fn remove_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut scanner = Scanner::default();
    let mut pending_comma: Option<String> = None;

    for ch in s.chars() {
        let structural = scanner.structural(ch);

        if let Some(buffer) = pending_comma.as_mut() {
            if structural && ch.is_whitespace() {
                buffer.push(ch);
                continue;
            }
            let buffer = pending_comma.take().unwrap_or_default();
            if structural && matches!(ch, '}' | ']') {
                // keep the whitespace, lose the comma
                out.push_str(&buffer[1..]);
            } else {
                out.push_str(&buffer);
            }
        }

        if structural && ch == ',' {
            pending_comma = Some(String::from(","));
        } else {
            out.push(ch);
        }
    }
    if let Some(buffer) = pending_comma {
        out.push_str(&buffer);
    }
    out
}

/// Append closers for any string, array or object left open
fn close_open_structures(s: &str) -> String {
    let mut scanner = Scanner::default();
    let mut stack = Vec::new();

    for ch in s.chars() {
        if !scanner.structural(ch) {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = s.trim_end().to_string();
    if scanner.in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Terminate string literals that run into a raw newline
fn close_strings_at_newline(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut scanner = Scanner::default();

    for ch in s.chars() {
        if matches!(ch, '\n' | '\r') && scanner.in_string {
            out.push('"');
            scanner = Scanner::default();
            out.push(ch);
            continue;
        }
        scanner.structural(ch);
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_not_repaired() {
        let (value, repaired) =
            extract_json_with_repair_status(r#"{"overall_risk_score": 42}"#).unwrap();
        assert!(!repaired);
        assert_eq!(value["overall_risk_score"], 42);
    }

    #[test]
    fn test_fenced_block_after_preamble() {
        let input = "Here is the assessment:\n```json\n{\"level\": \"High\"}\n```\nLet me know!";
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["level"], "High");
    }

    #[test]
    fn test_trailing_comma() {
        let input = r#"{"risks": [{"name": "Budget Overrun"},], }"#;
        let (value, repaired) = extract_json_with_repair_status(input).unwrap();
        assert!(repaired);
        assert_eq!(value["risks"][0]["name"], "Budget Overrun");
    }

    #[test]
    fn test_commas_inside_strings_survive() {
        let input = r#"{"note": "a, ]b", "x": [1, 2,]}"#;
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["note"], "a, ]b");
        assert_eq!(value["x"], json!([1, 2]));
    }

    #[test]
    fn test_truncated_output_is_closed() {
        let input = r#"{"risks": [{"name": "Data Security Breach", "impact": 0.9}"#;
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["risks"][0]["impact"], 0.9);
    }

    #[test]
    fn test_truncated_string() {
        let input = "{\"summary\": \"Vendor delays are lik";
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["summary"], "Vendor delays are lik");
    }

    #[test]
    fn test_embedded_in_prose() {
        let input = r#"Sure! {"trend": "increasing"} Hope this helps."#;
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["trend"], "increasing");
    }

    #[test]
    fn test_not_json() {
        assert!(extract_json_from_response("The project looks healthy overall.").is_err());
    }

    #[test]
    fn test_parse_or_raw_keeps_output() {
        let value = parse_or_raw("I could not compute a score.");
        assert_eq!(value["raw_output"], "I could not compute a score.");
        assert!(value["error"].as_str().unwrap().starts_with("Failed to parse JSON"));

        assert_eq!(parse_or_raw("[1, 2]"), json!([1, 2]));
    }
}
