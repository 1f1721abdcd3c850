//! run-remote-scripts - entry point
//!
//! Exit codes: 0 when every script passed, 1 when any script failed, 2 when
//! the run could not be completed.

mod cli;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use remote_scripts::{
    download_and_run, process_guard, HttpController, RunContext, RunSummary, RunnerConfig,
    RunnerError, SystemLauncher,
};

/// Initialize logging on stderr; `RUST_LOG` overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    info!("run-remote-scripts starting up");

    // Scripts are terminated if we receive SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    match cli.command {
        Commands::Validate { config } => match validate_config(&config) {
            Ok(()) => {
                println!("✓ Configuration file is valid: {}", config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Configuration validation failed: {:#}", e);
                eprintln!("✗ Configuration validation failed: {:#}", e);
                ExitCode::from(2)
            }
        },
        Commands::Run {
            config,
            url,
            credentials,
            scripts_dir,
            out_dir,
        } => {
            let overrides = Overrides {
                url,
                credentials,
                scripts_dir,
                out_dir,
            };
            match run(config, overrides) {
                Ok(summary) if summary.succeeded() => ExitCode::SUCCESS,
                Ok(summary) => {
                    warn!(failed = summary.tally.failed, "some scripts failed");
                    ExitCode::from(1)
                }
                Err(e) => {
                    error!("Run aborted: {:#}", e);
                    if e
                        .downcast_ref::<RunnerError>()
                        .is_some_and(RunnerError::is_startup_failure)
                    {
                        warn!("no script ran; the controller received no status");
                    }
                    eprintln!("✗ Run aborted: {:#}", e);
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn validate_config(path: &std::path::Path) -> Result<()> {
    let config = RunnerConfig::load_from_file(path)?;
    config.validate()
}

/// Command-line values that win over the config file.
struct Overrides {
    url: Option<String>,
    credentials: Option<String>,
    scripts_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
}

fn resolve_config(config_path: Option<PathBuf>, overrides: Overrides) -> Result<RunnerConfig> {
    let mut config = match config_path {
        Some(path) => RunnerConfig::load_from_file(path)?,
        None => {
            let url = overrides
                .url
                .clone()
                .context("--url is required without --config")?;
            let credentials = overrides
                .credentials
                .clone()
                .context("--credentials is required without --config")?;
            RunnerConfig::new(url, credentials)
        }
    };

    if let Some(url) = overrides.url {
        config.url = url;
    }
    if let Some(credentials) = overrides.credentials {
        config.credentials = credentials;
    }
    if overrides.scripts_dir.is_some() {
        config.scripts_dir = overrides.scripts_dir;
    }
    if overrides.out_dir.is_some() {
        config.out_dir = overrides.out_dir;
    }

    config.validate()?;
    Ok(config)
}

/// Use the configured directory or create a fresh one that outlives the run
fn run_dir(configured: Option<PathBuf>, prefix: &str) -> Result<PathBuf> {
    match configured {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            Ok(dir)
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix(prefix)
                .tempdir()
                .context("Failed to create temporary directory")?;
            Ok(dir.keep())
        }
    }
}

fn run(config_path: Option<PathBuf>, overrides: Overrides) -> Result<RunSummary> {
    let config = resolve_config(config_path, overrides)?;
    let controller =
        HttpController::new(&config.url, config.parsed_credentials()?, config.timeout())?;

    let scripts_dir = run_dir(config.scripts_dir.clone(), "maas-scripts-")?;
    let out_dir = run_dir(config.out_dir.clone(), "maas-scripts-out-")?;
    if scripts_dir.canonicalize()? == out_dir.canonicalize()? {
        anyhow::bail!(
            "Scripts and output directories resolve to the same place: {}",
            scripts_dir.display()
        );
    }
    debug!(
        scripts_dir = %scripts_dir.display(),
        out_dir = %out_dir.display(),
        "using run directories"
    );

    let launcher = SystemLauncher;
    let ctx = RunContext {
        controller: &controller,
        launcher: &launcher,
        scripts_dir,
        out_dir,
    };

    let summary = download_and_run(&ctx, &config.bundle_path)?;
    info!(
        status = %summary.status,
        attempted = summary.tally.attempted,
        failed = summary.tally.failed,
        "run complete"
    );
    Ok(summary)
}
