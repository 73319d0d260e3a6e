pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "xsell",
    about = "Cross-selling rule operator CLI",
    long_about = "Apply migrations, load demo data, inspect configuration and fields, import \
                  cross-selling rules and run bulk execution.",
    after_help = "Examples:\n  xsell migrate\n  xsell import-rules rules.json\n  xsell execute --rule lamps-need-bulbs"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo lamps and light bulbs catalog with its rules")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "List the standard and custom fields rules can reference")]
    Fields,
    #[command(about = "Validate and store cross-selling rules from a JSON file")]
    ImportRules {
        #[arg(help = "Path to a JSON file with one rule or an array of rules")]
        path: PathBuf,
    },
    #[command(about = "Run bulk execution for all active rules, or one rule by id")]
    Execute {
        #[arg(long = "rule", help = "Execute only this rule, even when it is inactive")]
        rule_id: Option<String>,
    },
}

/// Diagnostics go to stderr so stdout stays a single JSON document.
fn init_logging() {
    let filter = EnvFilter::try_from_env("XSELL_CLI_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Fields => commands::fields::run(),
        Command::ImportRules { path } => commands::import_rules::run(&path),
        Command::Execute { rule_id } => commands::execute::run(rule_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
