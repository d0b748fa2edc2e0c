//! CodeClarity CLI - command-line access to the CodeClarity platform.
//!
//! Manages authentication, analyzers, projects and analyses, and prints
//! analysis results as tables or JSON.

mod commands;
mod output;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use codeclarity_core::config::Overrides;
use codeclarity_core::Settings;

use commands::analysis::AnalysisCommand;
use commands::analyzer::AnalyzerCommand;
use commands::auth::LoginArgs;
use commands::config::ConfigCommand;
use commands::project::ProjectCommand;
use commands::result::ResultCommand;
use commands::Context;

/// Subdirectory of the config directory holding debug logs
const LOG_DIR: &str = "logs";

#[derive(Parser)]
#[command(name = "codeclarity")]
#[command(about = "Command-line client for the CodeClarity security analysis platform", long_about = None)]
#[command(version)]
struct Cli {
    /// Organization ID (overrides the configured default)
    #[arg(short, long, global = true)]
    org: Option<String>,

    /// Output format: table or json
    #[arg(short = 'f', long, global = true)]
    output: Option<String>,

    /// Verbose logging, also written to the log directory
    #[arg(long, global = true)]
    debug: bool,

    /// API base URL
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login(LoginArgs),

    /// Remove stored credentials
    Logout,

    /// Show authentication status
    Status,

    /// Show the current user
    Whoami,

    /// Show version information
    Version,

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage analyzers
    Analyzer {
        #[command(subcommand)]
        command: AnalyzerCommand,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Start and follow analyses
    Analysis {
        #[command(subcommand)]
        command: AnalysisCommand,
    },

    /// Inspect analysis results
    Result {
        #[command(subcommand)]
        command: ResultCommand,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            org_id: self.org.clone(),
            output_format: self.output.clone(),
            debug: self.debug,
        }
    }
}

/// Initialize logging to stderr, plus a daily log file when debugging.
///
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing(debug: bool, config_dir: &Path) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard, file_error) = if debug {
        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("codeclarity")
            .filename_suffix("log")
            .build(config_dir.join(LOG_DIR))
        {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false);
                (Some(layer), Some(guard), None)
            }
            Err(e) => (None, None, Some(e)),
        }
    } else {
        (None, None, None)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled: {}", e);
    }
    guard
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let ctx = Context::new(settings);

    match cli.command {
        Command::Login(mut args) => {
            if args.api_url.is_none() {
                args.api_url = cli.api_url;
            }
            commands::auth::login(&ctx, args).await
        }
        Command::Logout => commands::auth::logout(&ctx),
        Command::Status => commands::auth::status(&ctx),
        Command::Whoami => commands::auth::whoami(&ctx).await,
        Command::Version => {
            println!("codeclarity {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config { command } => commands::config::run(&ctx, command),
        Command::Analyzer { command } => commands::analyzer::run(&ctx, command).await,
        Command::Project { command } => commands::project::run(&ctx, command).await,
        Command::Analysis { command } => commands::analysis::run(&ctx, command).await,
        Command::Result { command } => commands::result::run(&ctx, command).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let settings = match Settings::load(&cli.overrides()).context("Failed to load configuration") {
        Ok(settings) => settings,
        Err(e) => {
            output::error(format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_tracing(settings.debug, &settings.config_dir);
    debug!(?settings, "Resolved settings");

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "codeclarity",
            "analysis",
            "list",
            "proj-1",
            "--org",
            "org-1",
            "-f",
            "json",
            "--page",
            "2",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.org_id.as_deref(), Some("org-1"));
        assert_eq!(overrides.output_format.as_deref(), Some("json"));
        match cli.command {
            Command::Analysis {
                command: AnalysisCommand::List { project, page },
            } => {
                assert_eq!(project, "proj-1");
                assert_eq!(page.page, 2);
                assert_eq!(page.per_page, 20);
            }
            _ => panic!("expected analysis list"),
        }
    }

    #[test]
    fn test_analysis_start_defaults() {
        let cli = Cli::try_parse_from([
            "codeclarity",
            "analysis",
            "start",
            "proj-1",
            "-a",
            "analyzer-1",
        ])
        .unwrap();

        match cli.command {
            Command::Analysis {
                command:
                    AnalysisCommand::Start {
                        branch,
                        watch,
                        commit,
                        ..
                    },
            } => {
                assert_eq!(branch, "main");
                assert!(!watch);
                assert!(commit.is_none());
            }
            _ => panic!("expected analysis start"),
        }
    }

    #[test]
    fn test_analyzer_create_file_conflicts_with_name() {
        let result = Cli::try_parse_from([
            "codeclarity",
            "analyzer",
            "create",
            "--file",
            "analyzer.json",
            "--name",
            "x",
        ]);
        assert!(result.is_err());
    }
}
