//! Shared fakes for integration tests.

#![allow(dead_code)]

use remote_scripts::{
    Controller, LaunchRequest, ReportingError, ScriptDescriptor, ScriptLauncher, StatusSignal,
    TransferError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Controller that records every signal and serves a fixed bundle.
#[derive(Default)]
pub struct RecordingController {
    pub bundle: Option<Vec<u8>>,
    pub signals: RefCell<Vec<StatusSignal>>,
    pub fetched: RefCell<Vec<String>>,
}

impl RecordingController {
    pub fn with_bundle(bundle: Vec<u8>) -> Self {
        Self {
            bundle: Some(bundle),
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.signals
            .borrow()
            .iter()
            .map(|s| s.error.clone().unwrap_or_default())
            .collect()
    }
}

impl Controller for RecordingController {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        self.fetched.borrow_mut().push(url.to_string());
        self.bundle.clone().ok_or_else(|| TransferError::Request {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }

    fn signal(&self, signal: &StatusSignal) -> Result<(), ReportingError> {
        self.signals.borrow_mut().push(signal.clone());
        Ok(())
    }
}

/// Launcher that "runs" a script by writing canned output and returning a
/// canned exit status, keyed by script file name. Unknown scripts exit 0.
#[derive(Default)]
pub struct FakeLauncher {
    pub exit_codes: HashMap<String, i32>,
    pub launched: RefCell<Vec<LaunchRequest>>,
}

impl FakeLauncher {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            exit_codes: names.iter().map(|n| (n.to_string(), 1)).collect(),
            ..Default::default()
        }
    }

    pub fn launched_names(&self) -> Vec<String> {
        self.launched
            .borrow()
            .iter()
            .map(|r| file_name(&r.script_path))
            .collect()
    }
}

impl ScriptLauncher for FakeLauncher {
    fn launch(&self, request: &LaunchRequest) -> io::Result<i32> {
        self.launched.borrow_mut().push(request.clone());
        let name = file_name(&request.script_path);
        std::fs::write(&request.stdout_path, format!("{} stdout", name))?;
        std::fs::write(&request.stderr_path, format!("{} stderr", name))?;
        Ok(self.exit_codes.get(&name).copied().unwrap_or(0))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn make_scripts(prefix: &str, count: usize, first_id: u64) -> Vec<ScriptDescriptor> {
    (0..count)
        .map(|i| {
            let name = format!("{}-{}", prefix, i);
            ScriptDescriptor {
                path: format!("{}/{}", prefix, name),
                name,
                script_result_id: first_id + i as u64,
                script_version_id: first_id + 500 + i as u64,
            }
        })
        .collect()
}

/// Write `index.json` with the given groups under version "1.0".
pub fn write_index(
    dir: &Path,
    commissioning: Option<&[ScriptDescriptor]>,
    testing: Option<&[ScriptDescriptor]>,
) {
    let mut groups = serde_json::Map::new();
    if let Some(scripts) = commissioning {
        groups.insert(
            "commissioning_scripts".to_string(),
            serde_json::to_value(scripts).unwrap(),
        );
    }
    if let Some(scripts) = testing {
        groups.insert(
            "testing_scripts".to_string(),
            serde_json::to_value(scripts).unwrap(),
        );
    }
    let index = serde_json::json!({ "1.0": groups });
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("index.json"), index.to_string()).unwrap();
}

/// Build an uncompressed tarball from `(path, content, mode)` members.
pub fn make_tar(members: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content, mode) in members {
        let mut header = tar::Header::new_ustar();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_path(path).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append(&header, *content).unwrap();
    }
    builder.into_inner().unwrap()
}
