//! FleetLens CLI
//!
//! Resolves a managed device's directory identity, aggregates its group
//! memberships, and cross-references them against the Intune assignment
//! feeds.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod config;
mod console;
mod logging;
mod render;
mod state;

use commands::{assignments, build_client, groups, logs, scripts};
use config::{default_config_path, AppConfig};
use fl_core::{AssignmentDomain, MutationAction};
use state::StateStore;

#[derive(Parser)]
#[command(name = "fleetlens")]
#[command(version)]
#[command(about = "Assignment-resolution lens for Intune-managed devices", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

fn parse_domain(s: &str) -> Result<AssignmentDomain, String> {
    match s.to_lowercase().as_str() {
        "configuration" | "config" => Ok(AssignmentDomain::Configuration),
        "compliance" => Ok(AssignmentDomain::Compliance),
        "application" | "app" | "apps" => Ok(AssignmentDomain::Application),
        "script" | "scripts" => Ok(AssignmentDomain::Script),
        _ => Err(format!("Invalid domain: {}", s)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one domain's assignments for a device
    Assignments {
        /// Console URL or managed-device id
        target: String,

        /// Assignment domain (configuration, compliance, application, script)
        #[arg(short, long, value_parser = parse_domain)]
        domain: Option<AssignmentDomain>,

        /// Case-insensitive substring filter on subject names
        #[arg(short, long)]
        filter: Option<String>,

        /// Sort subjects descending
        #[arg(long)]
        desc: bool,
    },

    /// Show a device's aggregated group memberships
    Memberships {
        /// Console URL or managed-device id
        target: String,
    },

    /// Search, create, and edit directory groups
    Group {
        #[command(subcommand)]
        action: GroupCommands,
    },

    /// Platform scripts
    Script {
        #[command(subcommand)]
        action: ScriptCommands,
    },

    /// Diagnostic log collection
    Logs {
        #[command(subcommand)]
        action: LogCommands,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Search directory groups by display name
    Search {
        /// Display-name prefix
        query: String,
    },

    /// Create a security group
    Create {
        /// Display name
        name: String,
    },

    /// Add the device (or its user) to groups
    Add {
        /// Console URL or managed-device id
        target: String,

        /// Group name or id (repeatable)
        #[arg(short, long = "group", value_name = "GROUP")]
        groups: Vec<String>,

        /// Mutate the associated user instead of the device
        #[arg(long)]
        user: bool,
    },

    /// Remove the device (or its user) from groups
    Remove {
        /// Console URL or managed-device id
        target: String,

        /// Group name or id (repeatable)
        #[arg(short, long = "group", value_name = "GROUP")]
        groups: Vec<String>,

        /// Mutate the associated user instead of the device
        #[arg(long)]
        user: bool,
    },
}

#[derive(Subcommand)]
enum ScriptCommands {
    /// Download a script's content
    Download {
        /// Console URL (policyId/...) or script id
        target: String,

        /// Output path (defaults to the script's file name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Request diagnostic log collection for an app on a device
    Collect {
        /// Console URL or managed-device id
        target: String,

        /// Application id
        #[arg(short, long)]
        app: String,

        /// Log folder to collect (repeatable)
        #[arg(short, long = "folder", value_name = "PATH")]
        folders: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let app_config = AppConfig::load(&config_path).unwrap_or_else(|_| {
        if cli.verbose {
            eprintln!("Using default configuration (no config file found)");
        }
        AppConfig::default()
    });

    let mut log_config = app_config.logging.clone();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    if cli.format == OutputFormat::Json {
        log_config.json_format = true;
    }
    logging::init(&log_config);

    let store = StateStore::new(&app_config.state_file);

    match cli.command {
        Commands::Assignments {
            target,
            domain,
            filter,
            desc,
        } => {
            let api = build_client(&app_config)?;
            assignments::run(
                &api,
                &store,
                assignments::AssignmentArgs {
                    target,
                    domain,
                    filter,
                    descending: desc,
                },
                cli.format,
            )
            .await
        }
        Commands::Memberships { target } => {
            let api = build_client(&app_config)?;
            assignments::memberships(&api, &target, cli.format).await
        }
        Commands::Group { action } => {
            let api = build_client(&app_config)?;
            match action {
                GroupCommands::Search { query } => {
                    groups::search(&api, &store, &query, cli.format).await
                }
                GroupCommands::Create { name } => groups::create(&api, &name, cli.format).await,
                GroupCommands::Add {
                    target,
                    groups: selected,
                    user,
                } => {
                    groups::mutate(
                        &api,
                        &store,
                        MutationAction::Add,
                        groups::MutateArgs {
                            target,
                            groups: selected,
                            as_user: user,
                        },
                        cli.format,
                    )
                    .await
                }
                GroupCommands::Remove {
                    target,
                    groups: selected,
                    user,
                } => {
                    groups::mutate(
                        &api,
                        &store,
                        MutationAction::Remove,
                        groups::MutateArgs {
                            target,
                            groups: selected,
                            as_user: user,
                        },
                        cli.format,
                    )
                    .await
                }
            }
        }
        Commands::Script { action } => {
            let api = build_client(&app_config)?;
            match action {
                ScriptCommands::Download { target, out } => {
                    scripts::download(&api, &target, out).await
                }
            }
        }
        Commands::Logs { action } => {
            let api = build_client(&app_config)?;
            match action {
                LogCommands::Collect {
                    target,
                    app,
                    folders,
                } => logs::collect(&api, &target, &app, &folders).await,
            }
        }
        Commands::Config { show_secrets } => {
            let display_config = if show_secrets {
                app_config
            } else {
                app_config.redact_secrets()
            };
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&display_config)?);
            } else {
                println!("{}", "Current Configuration".bold());
                println!("─────────────────────");
                println!("Config file: {}", config_path.display());
                println!("Graph base URL: {}", display_config.graph.base_url);
                println!("Timeout: {}s", display_config.graph.timeout_secs);
                println!("State file: {}", display_config.state_file.display());
                match &display_config.credential.token {
                    Some(token) => println!("Credential: static token ({})", token),
                    None => println!(
                        "Credential: capture file {}",
                        display_config.credential.capture_file.display()
                    ),
                }
            }
            Ok(())
        }
    }
}
