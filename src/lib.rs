//! Remote script runner
//!
//! Fetches the controller's script bundle onto a node being commissioned,
//! runs its commissioning and testing scripts in order and reports each
//! result back to the controller.

pub mod config_file;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod process_guard;
pub mod script_manifest;
pub mod script_runner;
pub mod script_traits;
pub mod sequencer;
pub mod signing;
pub mod status;

// Re-export main types for convenience
pub use config_file::RunnerConfig;
pub use error::{
    ConfigError, ExtractError, ManifestError, ReportingError, RunnerError, TransferError,
};
pub use fetcher::{download_and_extract_tar, extract_bundle};
pub use http::HttpController;
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use script_manifest::{ScriptDescriptor, ScriptGroup, ScriptManifest};
pub use script_runner::{run_scripts, RunContext, ScriptRunResult, SystemLauncher};
pub use script_traits::{Controller, LaunchRequest, ScriptLauncher};
pub use sequencer::{download_and_run, run_scripts_from_metadata, RunSummary, RunTally};
pub use signing::Credentials;
pub use status::{SignalStatus, StatusSignal};
