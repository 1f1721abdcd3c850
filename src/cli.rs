use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Download, run and report commissioning and testing scripts
#[derive(Parser)]
#[command(name = "run-remote-scripts")]
#[command(about = "Runs the controller's commissioning and testing scripts on this node")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the script bundle, run every script and report the results
    Run {
        /// Runner configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Controller metadata URL (overrides the config file)
        #[arg(long)]
        url: Option<String>,

        /// consumer_key:token_key:token_secret (overrides the config file)
        #[arg(long)]
        credentials: Option<String>,

        /// Directory to extract the bundle into
        #[arg(long)]
        scripts_dir: Option<PathBuf>,

        /// Directory for captured script output
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Validate a runner configuration file
    Validate {
        /// Path to the configuration file
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
