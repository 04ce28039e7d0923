//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/riskwatch/config.toml)
//! 3. Project config (.riskwatch/config.toml)
//! 4. Environment variables (RISKWATCH_* prefix, `__` separates sections)
//! 5. Conventional variables (OPENAI_API_KEY, PINECONE_*, VECTOR_DB_TYPE, LOG_LEVEL, DEBUG_MODE)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::types::{Config, VectorBackend};
use crate::types::{Result, RiskError};

const PROJECT_DIR: &str = ".riskwatch";
const CONFIG_FILE: &str = "config.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_from(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
            |key| env::var(key).ok(),
        )
    }

    /// Load with explicit file locations and environment lookup
    pub fn load_from<F>(global: Option<&Path>, project: &Path, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // RISKWATCH_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed("RISKWATCH_").split("__").lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| RiskError::Config(format!("Configuration error: {}", e)))?;

        Self::apply_conventional_env(&mut config, lookup);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| RiskError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the well-known variables used by hosted deployments.
    fn apply_conventional_env<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if config.llm.api_key.is_none() {
            config.llm.api_key = get("OPENAI_API_KEY");
        }

        let pinecone = &mut config.vector_db.pinecone;
        if pinecone.api_key.is_none() {
            pinecone.api_key = get("PINECONE_API_KEY");
        }
        if let Some(environment) = get("PINECONE_ENVIRONMENT") {
            pinecone.environment = environment;
        }
        if let Some(index) = get("PINECONE_INDEX_NAME") {
            pinecone.index_name = index;
        }

        if let Some(backend) = get("VECTOR_DB_TYPE") {
            match backend.parse::<VectorBackend>() {
                Ok(b) => config.vector_db.backend = b,
                Err(e) => warn!("Ignoring VECTOR_DB_TYPE: {}", e),
            }
        }

        if let Some(level) = get("LOG_LEVEL") {
            config.app.log_level = level.to_lowercase();
        }

        if let Some(debug_mode) = get("DEBUG_MODE") {
            config.app.debug = matches!(
                debug_mode.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/riskwatch/)
    pub fn global_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "riskwatch").map(|d| d.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join(CONFIG_FILE)
    }

    pub fn is_project_initialized() -> bool {
        Self::project_dir().exists()
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration as toml, json or yaml
    pub fn render(config: &Config, format: &str) -> Result<String> {
        match format {
            "json" => Ok(serde_json::to_string_pretty(config)?),
            "yaml" => Ok(serde_yaml::to_string(config)?),
            _ => toml::to_string_pretty(config).map_err(|e| RiskError::Config(e.to_string())),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            RiskError::Config("Cannot determine global config directory".to_string())
        })?;
        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join(CONFIG_FILE);
        Self::write_default(&config_path, force)?;
        Ok(global_dir)
    }

    /// Create `.riskwatch/` under `root` with a default config file
    pub fn init_project_at(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = root.join(PROJECT_DIR);
        fs::create_dir_all(&project_dir)?;

        Self::write_default(&project_dir.join(CONFIG_FILE), force)?;
        Ok(project_dir)
    }

    fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(());
        }
        fs::write(path, Self::default_config_template())?;
        info!("Created config: {}", path.display());
        Ok(())
    }

    fn default_config_template() -> &'static str {
        r#"# RiskWatch Configuration
# Environment variables override these values, e.g. RISKWATCH_LLM__MODEL=llama3

version = "1.0"

[llm]
# ollama | openai | none
provider = "ollama"
model = "llama3"
temperature = 0.2
timeout_secs = 120
# fallback_provider = "openai"
# fallback_model = "gpt-4o-mini"

# [llm.agent_models]
# reporting_agent = "llama3:70b"

[embedding]
# hashing | ollama | openai
provider = "hashing"
dimensions = 1536

[vector_db]
# sqlite | pinecone | none
backend = "sqlite"
path = ".riskwatch/vectors.db"

[risk.thresholds]
low = 25
medium = 50
high = 75

[chat]
history_path = ".riskwatch/chat_history.json"
max_history = 50

[dashboard]
bind = "127.0.0.1"
port = 8501
default_days_back = 30
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_from(None, &temp.path().join("missing.toml"), no_env).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "ollama");
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[llm]\nprovider = \"openai\"\nmodel = \"gpt-4o\"\n\n[risk.thresholds]\nlow = 20\nmedium = 40\nhigh = 80\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from(None, &path, no_env).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.risk.thresholds.high, 80);
        // untouched sections keep defaults
        assert_eq!(config.chat.max_history, 50);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[llm]\ntemperature = 9.0\n").unwrap();
        assert!(ConfigLoader::load_from(None, &path, no_env).is_err());
    }

    #[test]
    fn test_conventional_env() {
        let temp = TempDir::new().unwrap();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX_NAME", "risks-staging"),
            ("VECTOR_DB_TYPE", "pinecone"),
            ("LOG_LEVEL", "DEBUG"),
            ("DEBUG_MODE", "True"),
        ]);

        let config = ConfigLoader::load_from(None, &temp.path().join("none.toml"), |k| {
            vars.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.vector_db.backend, VectorBackend::Pinecone);
        assert_eq!(config.vector_db.pinecone.api_key.as_deref(), Some("pc-test"));
        assert_eq!(config.vector_db.pinecone.index_name, "risks-staging");
        assert_eq!(config.vector_db.pinecone.environment, "us-west1-gcp");
        assert_eq!(config.app.log_level, "debug");
        assert!(config.app.debug);
    }

    #[test]
    fn test_invalid_vector_backend_env_is_ignored() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(None, &temp.path().join("none.toml"), |k| {
            (k == "VECTOR_DB_TYPE").then(|| "redis".to_string())
        })
        .unwrap();
        assert_eq!(config.vector_db.backend, VectorBackend::Sqlite);
    }

    #[test]
    fn test_init_project_writes_loadable_template() {
        let temp = TempDir::new().unwrap();
        let dir = ConfigLoader::init_project_at(temp.path(), false).unwrap();
        let path = dir.join("config.toml");
        assert!(path.exists());

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.dashboard.port, 8501);
        assert_eq!(config.embedding.dimensions, 1536);
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        assert!(ConfigLoader::render(&config, "json").unwrap().contains("\"llm\""));
        assert!(ConfigLoader::render(&config, "yaml").unwrap().contains("llm:"));
        assert!(ConfigLoader::render(&config, "toml").unwrap().contains("[llm]"));
    }
}
