//! CLI entry point for the ddlsync schema reconciliation tool.
//! Provides clap-based command routing for plan, diff and validate, and exit code
//! mapping based on error type.

mod output;

use std::io::Read;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use ddlsync_core::config::{split_list, CliOverrides, DdlsyncConfig};
use ddlsync_core::error::DdlsyncError;
use ddlsync_core::Ddlsync;

/// Top-level CLI definition with global flags and subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "ddlsync",
    about = "Declarative MySQL schema reconciliation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Databases taking part in the comparison, comma-separated (overrides config)
    #[arg(long, value_name = "NAMES", global = true)]
    databases: Option<String>,

    /// Server default character set (overrides config)
    #[arg(long, value_name = "CHARSET", global = true)]
    character_set_server: Option<String>,

    /// Server default collation (overrides config)
    #[arg(long, value_name = "COLLATION", global = true)]
    collation_server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// All available ddlsync subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show the statements that turn FROM into TO
    Plan {
        /// Observed schema, e.g. a SHOW CREATE dump ("-" for stdin)
        #[arg(value_name = "FROM")]
        from: String,
        /// Desired schema
        #[arg(value_name = "TO")]
        to: String,
    },

    /// Show how FROM differs from TO
    Diff {
        /// Observed schema ("-" for stdin)
        #[arg(value_name = "FROM")]
        from: String,
        /// Desired schema
        #[arg(value_name = "TO")]
        to: String,
    },

    /// Parse and normalize a schema file
    Validate {
        /// Schema file ("-" for stdin)
        #[arg(value_name = "FILE")]
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &DdlsyncError) -> i32 {
    match error {
        DdlsyncError::ConfigError(_) => 2,
        DdlsyncError::ValidationError(_) => 3,
        DdlsyncError::ParseError { .. } | DdlsyncError::UnknownToken { .. } => 4,
        DdlsyncError::IoError(_) => 5,
        _ => 1,
    }
}

/// Read a schema file, or standard input for `-`.
fn read_schema(path: &str) -> Result<String, DdlsyncError> {
    log::debug!("Reading schema; path={}", path);
    if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Build configuration and dispatch the chosen subcommand.
fn run(cli: Cli) -> Result<(), DdlsyncError> {
    let overrides = CliOverrides {
        databases: cli.databases.as_deref().map(split_list),
        character_set_server: cli.character_set_server,
        collation_server: cli.collation_server,
    };
    let config = DdlsyncConfig::load(cli.config.as_deref(), &overrides)?;
    let ddlsync = Ddlsync::new(config);

    match &cli.command {
        Commands::Plan { from, to } => {
            let report = ddlsync.plan(&read_schema(from)?, &read_schema(to)?)?;
            if cli.json {
                output::print_json(&report)?;
            } else {
                output::print_plan_report(&report, cli.quiet);
            }
        }
        Commands::Diff { from, to } => {
            let report = ddlsync.diff(&read_schema(from)?, &read_schema(to)?)?;
            if cli.json {
                output::print_json(&report)?;
            } else {
                output::print_diff_report(&report, cli.quiet);
            }
        }
        Commands::Validate { file } => {
            let report = ddlsync.validate(&read_schema(file)?)?;
            if cli.json {
                output::print_json(&report)?;
            } else {
                output::print_validate_report(&report, cli.quiet);
            }
        }
    }

    Ok(())
}

/// Print a formatted error message with actionable hints to stderr.
fn print_error(error: &DdlsyncError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    match error {
        DdlsyncError::ConfigError(_) => {
            eprintln!(
                "{}",
                "Hint: Check your ddlsync.toml or the DDLSYNC_* environment variables.".dimmed()
            );
        }
        DdlsyncError::ValidationError(_) => {
            eprintln!(
                "{}",
                "Hint: Declare every database with CREATE DATABASE and select it with USE before its tables."
                    .dimmed()
            );
        }
        _ => {}
    }
}
