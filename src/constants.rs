//! Global Constants
//!
//! Centralized constants for risk scoring, data generation, and tuning.
//! All magic numbers should be defined here with documentation.

/// Risk taxonomy and scoring constants
pub mod risk {
    /// Canonical risk categories, in display order
    pub const CATEGORIES: [&str; 12] = [
        "Resource",
        "Schedule",
        "Budget",
        "Technical",
        "Quality",
        "Scope",
        "Communication",
        "External",
        "Vendor",
        "Regulatory",
        "Market",
        "Security",
    ];

    /// Default category weights in percent (sum to 100)
    pub const CATEGORY_WEIGHTS: [(&str, f64); 12] = [
        ("Security", 15.0),
        ("Budget", 12.0),
        ("Schedule", 12.0),
        ("Technical", 10.0),
        ("Resource", 10.0),
        ("Scope", 8.0),
        ("Quality", 8.0),
        ("Regulatory", 8.0),
        ("Vendor", 5.0),
        ("External", 4.0),
        ("Market", 4.0),
        ("Communication", 4.0),
    ];

    /// Weight applied to categories missing from the weight table
    pub const UNKNOWN_CATEGORY_WEIGHT: f64 = 1.0;

    /// Upper bound (inclusive) of the Low level
    pub const LOW_THRESHOLD: u32 = 25;

    /// Upper bound (inclusive) of the Medium level
    pub const MEDIUM_THRESHOLD: u32 = 50;

    /// Upper bound (inclusive) of the High level; above is Critical
    pub const HIGH_THRESHOLD: u32 = 75;

    /// Maximum aggregate score
    pub const MAX_SCORE: u32 = 100;

    /// Probability x impact above which a risk needs a mitigation plan
    pub const MITIGATION_PRIORITY_PRODUCT: f64 = 0.5;

    /// Heatmap quadrant split on both axes
    pub const HEATMAP_SPLIT: f64 = 0.5;

    /// Relative change (percent) beyond which a trend is not Stable
    pub const TREND_CHANGE_THRESHOLD_PCT: f64 = 5.0;
}

/// Display colors for risk levels
pub mod colors {
    pub const LOW: &str = "#26eb77";
    pub const MEDIUM: &str = "#f0cc45";
    pub const HIGH: &str = "#eb4034";
    pub const CRITICAL: &str = "#8b0000";
}

/// Project catalog constants
pub mod projects {
    /// Pseudo project that aggregates every default project
    pub const ALL_PROJECTS: &str = "All Projects";

    /// Projects offered by the dashboard selector
    pub const DEFAULT_PROJECTS: [&str; 5] = [
        "Cloud Migration",
        "Mobile App Development",
        "ERP Implementation",
        "E-commerce Platform",
        "Data Warehouse Project",
    ];
}

/// Vector store constants
pub mod vector {
    pub const PROJECTS_COLLECTION: &str = "projects";
    pub const RISKS_COLLECTION: &str = "risks";
    pub const MARKET_DATA_COLLECTION: &str = "market_data";
    pub const REPORTS_COLLECTION: &str = "reports";

    /// All collections created on initialization
    pub const COLLECTIONS: [&str; 4] = [
        PROJECTS_COLLECTION,
        RISKS_COLLECTION,
        MARKET_DATA_COLLECTION,
        REPORTS_COLLECTION,
    ];

    /// Embedding width used when no model reports one
    pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

    /// Default result count for similarity queries
    pub const DEFAULT_QUERY_LIMIT: usize = 5;

    /// Upper bound on documents scanned by filter-only lookups
    pub const MAX_FILTER_RESULTS: usize = 1000;
}

/// Chat constants
pub mod chat {
    /// Maximum turns retained in the history file
    pub const MAX_HISTORY: usize = 50;

    /// Default history file name inside the data directory
    pub const HISTORY_FILE: &str = "chat_history.json";

    /// Reply used when no language model is configured
    pub const UNAVAILABLE_REPLY: &str =
        "I'm having trouble connecting to the risk analysis system. Please try again later.";
}

/// LLM constants
pub mod llm {
    /// Default sampling temperature for agents
    pub const AGENT_TEMPERATURE: f32 = 0.2;

    /// Default Ollama model
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

    /// Default Ollama endpoint
    pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

    /// Default OpenAI chat model
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

    /// Default OpenAI embedding model
    pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

    /// Maximum tokens requested per completion
    pub const DEFAULT_MAX_TOKENS: usize = 2048;
}

/// Provider chain constants
pub mod chain {
    /// Default maximum retries per provider
    pub const DEFAULT_MAX_RETRIES: usize = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 10;
}

/// Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}

/// Mock data constants
pub mod data {
    /// Snapshot refresh interval / cache TTL (seconds)
    pub const REFRESH_INTERVAL_SECS: u64 = 3600;

    /// Default dashboard time window (days)
    pub const DEFAULT_DAYS_BACK: u32 = 30;

    /// Bounds of the dashboard time window slider
    pub const MIN_DAYS_BACK: u32 = 7;
    pub const MAX_DAYS_BACK: u32 = 90;

    /// Window used by market analysis (hours)
    pub const MARKET_WINDOW_HOURS: i64 = 24 * 7;

    /// Reports returned by default from report history lookups
    pub const DEFAULT_REPORT_LIMIT: usize = 5;
}

/// Dashboard server constants
pub mod dashboard {
    pub const DEFAULT_BIND: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8501;
}
