//! Config Command
//!
//! Manage RiskWatch configuration.
//!
//! Usage:
//!   riskwatch config show [-g] [-f json|yaml|toml]
//!   riskwatch config path
//!   riskwatch config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show configuration
pub fn show(global: bool, format: &str) -> Result<()> {
    if global {
        match ConfigLoader::global_config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                println!("# Global Config: {}\n", path.display());
                println!("{}", content);
            }
            Some(_) => {
                println!("No global config found.");
                println!("Run 'riskwatch config init --global' to create one.");
            }
            None => println!("Cannot determine global config directory."),
        }
        return Ok(());
    }

    // Merged effective config
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, format)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global configuration
pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    let out = Output::new();
    out.success("Initialized global configuration");
    out.field("Directory:", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        out.field("Config:", config_path.display());
    }
    Ok(())
}

/// Initialize project configuration in the current directory
pub fn init_project(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let dir = ConfigLoader::init_project_at(&root, force)?;
    let out = Output::new();
    out.success("Initialized project configuration");
    out.field("Directory:", dir.display());
    out.field("Config:", ConfigLoader::project_config_path().display());
    Ok(())
}
