pub mod chat;
pub mod error;
pub mod project;
pub mod risk;
pub mod utils;

pub use chat::{ChatMessage, ChatRole};
pub use error::{ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt, RiskError};
pub use project::{MarketDataEntry, MarketDataKind, Project, Report};
pub use risk::{Risk, RiskCategory, RiskLevel, RiskStatus, normalize_unit};
pub use utils::{
    ParseWithDefault, format_timestamp, json_f64, json_i64, json_string, json_string_array,
    json_string_or, log_filter_warn, truncate_chars,
};
