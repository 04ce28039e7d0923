use console::style;

use crate::types::RiskLevel;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", style(label).dim(), value);
    }

    /// Level name colored by severity
    pub fn level(&self, level: RiskLevel) -> String {
        let text = style(level.as_str());
        match level {
            RiskLevel::Low => text.green(),
            RiskLevel::Medium => text.yellow(),
            RiskLevel::High => text.red(),
            RiskLevel::Critical => text.red().bold(),
        }
        .to_string()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
