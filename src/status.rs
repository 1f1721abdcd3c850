//! Status signals sent from the node back to the controller.

use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Status keyword carried by every signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SignalStatus {
    /// A script is about to run or has just finished
    Working,
    /// The node is entering the testing phase
    Testing,
    /// Every script exited zero
    Ok,
    /// At least one script exited non-zero
    Failed,
}

/// One status report.
///
/// `files` maps a logical filename to raw bytes and is uploaded as file
/// parts. A `BTreeMap` keeps the upload order stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSignal {
    pub status: SignalStatus,
    pub error: Option<String>,
    pub exit_status: Option<i32>,
    pub script_result_id: Option<u64>,
    pub script_version_id: Option<u64>,
    pub files: BTreeMap<String, Vec<u8>>,
}

impl StatusSignal {
    pub fn new(status: SignalStatus) -> Self {
        Self {
            status,
            error: None,
            exit_status: None,
            script_result_id: None,
            script_version_id: None,
            files: BTreeMap::new(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn with_exit_status(mut self, exit_status: i32) -> Self {
        self.exit_status = Some(exit_status);
        self
    }

    /// Tag the signal with the controller's correlation identifiers.
    pub fn for_script(mut self, script_result_id: u64, script_version_id: u64) -> Self {
        self.script_result_id = Some(script_result_id);
        self.script_version_id = Some(script_version_id);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, content: Vec<u8>) -> Self {
        self.files.insert(name.into(), content);
        self
    }
}

pub const ALL_SCRIPTS_PASSED: &str = "All scripts successfully ran";

pub fn starting_message(name: &str, position: usize, total: usize) -> String {
    format!("Starting {} [{}/{}]", name, position, total)
}

pub fn finished_message(name: &str, position: usize, total: usize, exit_status: i32) -> String {
    format!("Finished {} [{}/{}]: {}", name, position, total, exit_status)
}

pub fn failed_summary(failed: u32) -> String {
    format!("{} scripts failed to run", failed)
}
