use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riskwatch::cli::commands;
use riskwatch::constants::projects::ALL_PROJECTS;
use riskwatch::constants::vector::DEFAULT_QUERY_LIMIT;

#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(
    version,
    about = "AI project risk management dashboard with a multi-agent assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web dashboard
    Serve {
        #[arg(long, help = "Bind address (default from config)")]
        bind: Option<String>,
        #[arg(long, short, help = "Port (default from config)")]
        port: Option<u16>,
    },

    /// Ask the risk analysis agents a question
    Chat {
        #[arg(help = "Question about project risks")]
        message: String,
        #[arg(long, short, default_value = ALL_PROJECTS, help = "Project to focus on")]
        project: String,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Load sample projects, risks and market data into the vector store
    Seed,

    /// Generate a risk report for a project
    Report {
        #[arg(help = "Project name")]
        project: String,
        #[arg(short = 'd', long, help = "Days of history to consider")]
        days: Option<u32>,
        #[arg(
            short = 'f',
            long,
            default_value = "markdown",
            help = "Output format: markdown, csv"
        )]
        format: String,
        #[arg(long, short, help = "Write to a file or directory instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Show the aggregate risk score of a project
    Score {
        #[arg(help = "Project name")]
        project: String,
        #[arg(short = 'd', long, help = "Days of history to consider")]
        days: Option<u32>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Search stored risks by similarity
    Search {
        #[arg(help = "Search text")]
        query: String,
        #[arg(long, short, help = "Restrict to one project")]
        project: Option<String>,
        #[arg(short = 'n', long, default_value_t = DEFAULT_QUERY_LIMIT, help = "Maximum results")]
        limit: usize,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Show configuration and storage status
    Status {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mRiskWatch encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => commands::config::show(global, &format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?;
                } else {
                    commands::config::init_project(force)?;
                }
            }
        },
        command => {
            let rt = Runtime::new()?;
            rt.block_on(run_async(command))?;
        }
    }

    Ok(())
}

async fn run_async(command: Commands) -> riskwatch::Result<()> {
    match command {
        Commands::Serve { bind, port } => commands::serve::run(bind, port).await,
        Commands::Chat {
            message,
            project,
            format,
        } => commands::chat::run(&message, &project, &format).await,
        Commands::Seed => commands::seed::run().await,
        Commands::Report {
            project,
            days,
            format,
            output,
        } => {
            commands::report::run(commands::report::ReportOptions {
                project,
                days,
                format,
                output,
            })
            .await
        }
        Commands::Score {
            project,
            days,
            format,
        } => commands::score::run(&project, days, &format).await,
        Commands::Search {
            query,
            project,
            limit,
            format,
        } => commands::search::run(&query, project.as_deref(), limit, &format).await,
        Commands::Status { format } => commands::status::run(&format).await,
        Commands::Config { .. } => Ok(()),
    }
}
