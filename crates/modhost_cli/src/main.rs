//! `modhost` command-line front end.
//!
//! # Responsibility
//! - Boot a module host over a database file with the first-party modules.
//! - Inspect and toggle module state without a UI.

use clap::{Parser, Subcommand, ValueEnum};
use modhost_core::{
    init_logging_from_config, DashboardEntry, HostConfig, ModuleConfiguration, ModuleDescriptor,
    ModuleHost, StaticModule,
};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspect and manage host modules
#[derive(Parser)]
#[command(name = "modhost")]
#[command(author, version = modhost_core::core_version(), about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database holding module state (in-memory when omitted)
    #[arg(long, global = true, env = "MODHOST_DB_PATH")]
    db: Option<PathBuf>,

    /// Allow enable/disable transitions that break declared requirements
    #[arg(long, global = true)]
    ignore_requires: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered modules and their state
    List {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Enable a module, applying pending migrations
    Enable {
        /// Module id
        id: String,
    },

    /// Disable a module
    Disable {
        /// Module id
        id: String,
    },

    /// Show dashboard and navigation contributions of enabled modules
    Extensions {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show or update a module configuration
    Config {
        /// Module id
        id: String,

        /// Setting assignment (key=value); values are parsed as JSON when possible
        #[arg(short, long)]
        set: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = HostConfig::from_env().map_err(|err| err.to_string())?;
    if cli.db.is_some() {
        config.db_path = cli.db;
    }
    if cli.ignore_requires {
        config.enforce_requires = false;
    }
    init_logging_from_config(&config)?;

    let mut host = ModuleHost::open(config).map_err(|err| err.to_string())?;
    for module in StaticModule::baseline() {
        let id = module.id().to_string();
        if !host.register(module) {
            return Err(describe_failure(&host, "register", &id));
        }
    }

    match cli.command {
        Commands::List { format } => print_manifests(&host, format),
        Commands::Enable { id } => {
            if !host.enable(&id) {
                return Err(describe_failure(&host, "enable", &id));
            }
            println!("enabled {id}");
            Ok(())
        }
        Commands::Disable { id } => {
            if !host.disable(&id) {
                return Err(describe_failure(&host, "disable", &id));
            }
            println!("disabled {id}");
            Ok(())
        }
        Commands::Extensions { format } => print_extensions(&host, format),
        Commands::Config { id, set } => configure(&mut host, &id, &set),
    }
}

fn print_manifests(host: &ModuleHost, format: Format) -> Result<(), String> {
    let manifests = host.list_manifests();
    match format {
        Format::Json => print_json(&manifests),
        Format::Text => {
            for manifest in manifests {
                let state = if manifest.is_enabled { "enabled" } else { "disabled" };
                let requires = if manifest.requires.is_empty() {
                    String::new()
                } else {
                    format!(" requires={}", manifest.requires.join(","))
                };
                println!(
                    "{:<12} {:<8} {:<9} {}{}",
                    manifest.id, manifest.version, state, manifest.name, requires
                );
            }
            Ok(())
        }
    }
}

fn print_extensions(host: &ModuleHost, format: Format) -> Result<(), String> {
    let dashboard = host.dashboard_extensions();
    let navigation = host.navigation_extensions();
    match format {
        Format::Json => print_json(&serde_json::json!({
            "dashboard": dashboard,
            "navigation": navigation,
        })),
        Format::Text => {
            println!("dashboard:");
            for entry in &dashboard {
                match entry {
                    DashboardEntry::Item { module_id, item } => {
                        println!("  [{:>4}] {} ({module_id})", item.priority, item.title)
                    }
                    DashboardEntry::Unavailable { module_id, message } => {
                        println!("  [   -] unavailable ({module_id}): {message}")
                    }
                }
            }
            println!("navigation:");
            for entry in &navigation {
                println!(
                    "  [{:>4}] {} -> {} ({})",
                    entry.item.order, entry.item.label, entry.item.route, entry.module_id
                );
            }
            Ok(())
        }
    }
}

fn configure(host: &mut ModuleHost, module_id: &str, assignments: &[String]) -> Result<(), String> {
    let mut configuration = host
        .get_configuration(module_id)
        .map_err(|err| err.to_string())?;

    if !assignments.is_empty() {
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment)?;
            configuration.settings.insert(key, value);
        }
        let update = ModuleConfiguration::new(module_id, configuration.settings);
        configuration = host
            .save_configuration(&update)
            .map_err(|err| err.to_string())?;
    }

    print_json(&configuration)
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    Ok((key.to_string(), value))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn describe_failure(host: &ModuleHost, action: &str, module_id: &str) -> String {
    match host.last_error() {
        Some(err) => format!("{action} {module_id} failed: {err}"),
        None => format!("{action} {module_id} failed"),
    }
}
