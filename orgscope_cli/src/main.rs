use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

use orgscope_cli::commands::diagnose::{self, DiagnoseArgs};
use orgscope_cli::commands::usage::{self, UsageArgs};
use orgscope_cli::commands::OutputSettings;
use orgscope_cli::config::{AppConfig, ConfigManager, display_value};
use orgscope_cli::error::{CliError, CliResult, ErrorContext, ExitCode};
use orgscope_cli::output::OutputFormat;
use orgscope_cli::terminal::TerminalCaps;

#[derive(Parser)]
#[command(name = "orgscope")]
#[command(author, version, about = "OrgScope - CRM org diagnostics and field usage audits", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find where an object's fields are referenced
    Usage {
        /// Object API name (e.g. Account, Invoice__c)
        object: String,

        /// Analyze a single field instead of every field
        #[arg(short, long)]
        field: Option<String>,

        /// Also scan report definitions (slow on large orgs)
        #[arg(long)]
        include_reports: bool,

        /// Write a CSV export; the file name defaults to OBJECT_field_usage_TIMESTAMP.csv
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        csv: Option<Option<PathBuf>>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Disable the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// Diagnose a problem and suggest fixes
    Diagnose {
        /// Issue type (trigger, flow, validation, field, permission, formula,
        /// picklist, lookup, layout, report or auto)
        issue_type: String,

        /// What is going wrong, in plain words
        description: String,

        /// Object the problem occurs on
        #[arg(short, long)]
        object: Option<String>,

        /// Field involved
        #[arg(short, long)]
        field: Option<String>,

        /// Component involved (trigger, flow or rule name)
        #[arg(short, long)]
        component: Option<String>,

        /// Generate fix text where possible
        #[arg(long)]
        auto_fix: bool,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Disable the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., org.instance_url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., core.pool.max_connections)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("orgscope_core", log::LevelFilter::Debug)
            .filter_module("orgscope_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if !TerminalCaps::detect().use_color() {
        colored::control::set_override(false);
    }

    let debug = cli.debug;
    match run(cli) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            eprint!("{}", error.format_for_user(debug));
            error.exit_code().into()
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Usage {
            object,
            field,
            include_reports,
            csv,
            format,
            no_progress,
        } => {
            let config = load_config()?;
            let settings = output_settings(&config, format, no_progress)?;
            let args = UsageArgs {
                object,
                field,
                include_reports,
                csv,
            };
            usage::run(&config, &args, &settings)
        }
        Commands::Diagnose {
            issue_type,
            description,
            object,
            field,
            component,
            auto_fix,
            format,
            no_progress,
        } => {
            let config = load_config()?;
            let settings = output_settings(&config, format, no_progress)?;
            let args = DiagnoseArgs {
                issue_type,
                description,
                object,
                field,
                component,
                auto_fix,
            };
            diagnose::run(&config, &args, &settings)
        }
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn load_config() -> CliResult<AppConfig> {
    ConfigManager::new().load().map_err(|e| {
        CliError::misuse(&format!("{e:#}"))
            .with_suggestion("Check the file shown by 'orgscope config list'")
    })
}

/// Resolve format, color and spinner from flags, config and the terminal
fn output_settings(
    config: &AppConfig,
    format: Option<OutputFormat>,
    no_progress: bool,
) -> CliResult<OutputSettings> {
    let format = match format {
        Some(format) => format,
        None => OutputFormat::from_string(&config.output.default_format)
            .map_err(|e| CliError::misuse(&e.to_string()))?,
    };

    let caps = TerminalCaps::detect();
    let use_color = config.output.color_enabled && caps.use_color();
    if !use_color {
        colored::control::set_override(false);
    }

    let show_progress = !no_progress
        && config.output.progress_enabled
        && caps.show_spinner();

    Ok(OutputSettings {
        format,
        use_color,
        show_progress,
    })
}

fn config_command(command: ConfigCommand) -> CliResult<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager
                .get(&key)
                .map_err(|e| CliError::not_found(&e.to_string()).with_context("key", &key))?;
            println!("{}", display_value(&key, &value));
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .map_err(|e| CliError::misuse(&format!("{e:#}")).with_context("key", &key))?;
            eprintln!(
                "{}",
                format!("Set {key} = {}", display_value(&key, &value)).green()
            );
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;

            println!("{}", "Configuration:".bold().blue());
            println!("Config file: {}", manager.get_config_path().display());
            println!();

            // Group items by section
            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let section = key.split('.').next().unwrap_or("general").to_string();
                sections.entry(section).or_default().push((key, value));
            }

            for (section, items) in sections {
                println!("[{}]", section.yellow());
                for (key, value) in items {
                    let display_key = key.split_once('.').map_or(key.as_str(), |(_, rest)| rest);
                    println!("  {} = {}", display_key.cyan(), display_value(&key, &value));
                }
                println!();
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
