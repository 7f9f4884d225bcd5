//! dbgate CLI - wait for PostgreSQL, provision the test database, run tests
//!
//! Main entry point for the dbgate command-line tool.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dbgate::{Gate, GateConfig, HealthChecker, PgConnector, TestRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "dbgate")]
#[command(about = "Wait for PostgreSQL, ensure the test database exists, then run the tests", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Optional TOML configuration file
    #[arg(long, global = true, env = "DBGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of connection attempts
    #[arg(long, global = true, env = "DBGATE_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Pause between connection attempts in milliseconds
    #[arg(long, global = true, env = "DBGATE_RETRY_INTERVAL_MS")]
    retry_interval_ms: Option<u64>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "DBGATE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait until the database server accepts connections
    Wait,

    /// Wait for the server, then create the target database if missing
    Provision,

    /// Open the gate, then run the test runner with the remaining arguments
    Run {
        /// Test runner program
        #[arg(long, env = "DBGATE_TEST_RUNNER")]
        runner: Option<String>,

        /// Arguments passed to the runner verbatim
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check the server and target database once, without retrying
    Check {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

/// Output formats for `check`
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable table
    Text,
    /// Pretty-printed JSON report
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let Cli {
        config: config_path,
        max_attempts,
        retry_interval_ms,
        log_level,
        command,
    } = cli;

    let mut config = dbgate::load_config(config_path.as_deref())
        .await
        .context("loading configuration")?;

    // CLI flags take precedence over file and environment
    if let Some(max_attempts) = max_attempts {
        config.readiness.max_attempts = max_attempts;
    }
    if let Some(retry_interval_ms) = retry_interval_ms {
        config.readiness.retry_interval_ms = retry_interval_ms;
    }
    if let Some(level) = log_level {
        config.logging.level = level;
    }

    dbgate::logging::init(&config.logging);

    let result = execute(command, &config).await;
    if let Err(e) = &result {
        let message = format!("{:#}", e);
        error!(error = %message, "dbgate failed");
    }
    result
}

async fn execute(command: Commands, config: &GateConfig) -> anyhow::Result<u8> {
    match command {
        Commands::Wait => {
            let gate = build_gate(config)?;
            gate.wait_until_ready().await?;
            Ok(0)
        }
        Commands::Provision => {
            let gate = build_gate(config)?;
            gate.open().await?;
            Ok(0)
        }
        Commands::Run { runner, args } => {
            let gate = build_gate(config)?;
            gate.open().await?;

            let database_url = gate.descriptor().database_url()?;
            let program = runner.unwrap_or_else(|| config.runner.program.clone());
            let code = TestRunner::new(program)
                .args(args)
                .env("DATABASE_URL", database_url.as_str())
                .run()
                .await?;
            Ok(u8::try_from(code).unwrap_or(1))
        }
        Commands::Check { format } => {
            let descriptor = config.descriptor()?;
            let connector = PgConnector::with_connect_timeout(config.connect_timeout());
            let report = HealthChecker::check(&connector, &descriptor).await;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Target: {} / {}", descriptor.endpoint(), descriptor.name);
                println!("Status: {} {}", report.status.icon(), report.status);
                println!();
                println!("{:<12} {:<14} {:<10} {}", "Component", "Status", "Time (ms)", "Detail");
                println!("{}", "-".repeat(72));

                for component in &report.components {
                    println!(
                        "{:<12} {:<14} {:<10} {}",
                        component.component,
                        format!("{} {}", component.status.icon(), component.status),
                        component.elapsed_ms,
                        component.detail.as_deref().unwrap_or("-"),
                    );
                }
            }

            Ok(if report.is_healthy() { 0 } else { 1 })
        }
        Commands::Config => {
            print!("{}", config.to_redacted_toml()?);
            Ok(0)
        }
    }
}

fn build_gate(config: &GateConfig) -> dbgate::Result<Gate<PgConnector>> {
    let descriptor = config.descriptor()?;
    let policy = config.readiness_policy()?;
    let connector = PgConnector::with_connect_timeout(config.connect_timeout());
    Ok(Gate::new(connector, descriptor, policy))
}
