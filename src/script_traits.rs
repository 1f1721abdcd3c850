//! Capabilities the runner depends on.
//!
//! The pipeline never talks to the network or spawns processes directly.
//! It goes through these two traits so tests can substitute recording
//! fakes without touching process-wide state.
//!
//! # Contract
//!
//! - `Controller::fetch` returns the raw body of a successful GET.
//! - `Controller::signal` delivers exactly one status report. Failures are
//!   returned, never retried or swallowed.
//! - `ScriptLauncher::launch` blocks until the child exits and returns its
//!   exit status. An `Err` means the child could not be started at all.

use crate::error::{ReportingError, TransferError};
use crate::status::StatusSignal;
use std::io;
use std::path::PathBuf;

/// The controller endpoint a node reports to.
pub trait Controller {
    /// Download `url` (absolute, or relative to the controller base URL).
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError>;

    /// Send one status signal.
    fn signal(&self, signal: &StatusSignal) -> Result<(), ReportingError>;
}

/// Everything needed to start one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Absolute path to the executable
    pub script_path: PathBuf,
    /// Working directory for the child
    pub working_dir: PathBuf,
    /// File receiving the child's standard output
    pub stdout_path: PathBuf,
    /// File receiving the child's standard error
    pub stderr_path: PathBuf,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

/// Runs one script to completion.
pub trait ScriptLauncher {
    fn launch(&self, request: &LaunchRequest) -> io::Result<i32>;
}
