use clap::{Parser, Subcommand, builder::styling};
use dw_etl::{cli, config::EtlConfig, config::split_tables};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Warehouse ETL: stages AdventureWorks dimension tables from SQL Server into PostgreSQL
#[derive(Parser)]
#[command(name = "dwetl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// YAML rules file replacing the built-in transform rules
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Also write untransformed src_ copies of every extracted table
    #[arg(long)]
    stage_raw: bool,

    /// Write the run verdict as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Attempts per stage before the run is aborted (overrides ETL_MAX_ATTEMPTS)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Seconds between attempts (overrides ETL_RETRY_DELAY_SECS)
    #[arg(long)]
    retry_delay: Option<u64>,

    /// Comma-separated tables to extract (overrides ETL_TABLES)
    #[arg(short, long)]
    tables: Option<String>,

    /// Command to execute, runs the pipeline when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline (the default)
    Run,

    /// Test connectivity to the source and destination databases
    Check,

    /// Print the effective transform rules as YAML
    Rules,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match dotenvy::from_filename(&cli.env) {
        Err(e) if !e.not_found() => return Err(e.into()),
        _ => {}
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    log::info!("dwetl {}", env!("CARGO_PKG_VERSION"));

    let rules = cli::load_rules(cli.rules.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Rules => {
            print!("{}", cli::render_rules(&rules)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let config = EtlConfig::from_env()?;
            log::info!("Checking connectivity");
            match cli::check_connections(&config).await {
                true => Ok(ExitCode::SUCCESS),
                false => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Run => {
            let mut config = EtlConfig::from_env()?;
            if let Some(max_attempts) = cli.max_attempts {
                config.policy.max_attempts = max_attempts;
            }
            if let Some(delay) = cli.retry_delay {
                config.policy.delay = Duration::from_secs(delay);
            }
            if let Some(tables) = cli.tables.as_deref() {
                config.tables = split_tables(tables);
            }

            log::info!(
                "Running {} table(s) with up to {} attempt(s) per stage{}",
                config.tables.len().cyan(),
                config.policy.max_attempts,
                match cli.stage_raw {
                    true => ", staging raw copies",
                    false => "",
                }
            );
            let verdict =
                cli::run_pipeline(&config, rules, cli.stage_raw, cli.report.as_deref()).await?;
            Ok(ExitCode::from(verdict.exit_code()))
        }
    }
}
