//! Script execution and per-script reporting.
//!
//! Scripts of a group run one at a time in manifest order. Each one is
//! bracketed by two signals: a WORKING "Starting" before launch and a
//! "Finished" carrying the exit status and the captured output files.
//!
//! A non-zero exit is an expected outcome: it is counted and reported and
//! the next script runs. A script that cannot even be started is reported
//! the same way. Only a failure to deliver a signal stops the group.

use crate::error::{Result, RunnerError};
use crate::process_guard::{ChildRegistration, CommandProcessGroup};
use crate::script_manifest::ScriptDescriptor;
use crate::script_traits::{Controller, LaunchRequest, ScriptLauncher};
use crate::status::{finished_message, starting_message, SignalStatus, StatusSignal};
use std::fs::File;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Exit status reported when a script's executable does not exist.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status reported when a script's executable cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit status reported for any other launch failure.
pub const EXIT_LAUNCH_FAILED: i32 = -1;

/// Everything one run needs. The directories are owned by the caller and
/// must not be shared with a concurrent run.
pub struct RunContext<'a> {
    pub controller: &'a dyn Controller,
    pub launcher: &'a dyn ScriptLauncher,
    /// Where the bundle was extracted
    pub scripts_dir: PathBuf,
    /// Where captured stdout/stderr files are written
    pub out_dir: PathBuf,
}

/// Outcome of one script. Lives only until its Finished signal is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRunResult {
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// 1-based position within the group
    pub position: usize,
    pub total: usize,
}

impl ScriptRunResult {
    pub fn failed(&self) -> bool {
        self.exit_status != 0
    }

    /// The "Finished" signal for `script`, consuming the captured output.
    pub fn into_finished_signal(self, script: &ScriptDescriptor) -> StatusSignal {
        StatusSignal::new(SignalStatus::Working)
            .with_error(finished_message(
                &script.name,
                self.position,
                self.total,
                self.exit_status,
            ))
            .with_exit_status(self.exit_status)
            .for_script(script.script_result_id, script.script_version_id)
            .with_file(script.name.clone(), self.stdout)
            .with_file(script.stderr_name(), self.stderr)
    }
}

/// Run every script of one group in order and report each of them.
///
/// Returns how many scripts exited non-zero.
pub fn run_scripts(ctx: &RunContext<'_>, scripts: &[ScriptDescriptor]) -> Result<u32> {
    let total = scripts.len();
    let mut failed = 0;

    for (index, script) in scripts.iter().enumerate() {
        let position = index + 1;
        info!(script = %script.name, position, total, "starting script");

        let starting = StatusSignal::new(SignalStatus::Working)
            .with_error(starting_message(&script.name, position, total))
            .for_script(script.script_result_id, script.script_version_id);
        ctx.controller.signal(&starting)?;

        let result = run_script(ctx, script, position, total)?;
        info!(
            script = %script.name,
            exit_status = result.exit_status,
            "finished script"
        );
        if result.failed() {
            failed += 1;
        }

        ctx.controller.signal(&result.into_finished_signal(script))?;
    }

    Ok(failed)
}

fn run_script(
    ctx: &RunContext<'_>,
    script: &ScriptDescriptor,
    position: usize,
    total: usize,
) -> Result<ScriptRunResult> {
    std::fs::create_dir_all(&ctx.out_dir).map_err(|e| RunnerError::io(&ctx.out_dir, e))?;

    let stdout_path = ctx.out_dir.join(&script.name);
    let stderr_path = ctx.out_dir.join(script.stderr_name());
    let request = LaunchRequest {
        script_path: script.resolve(&ctx.scripts_dir),
        working_dir: ctx.scripts_dir.clone(),
        env: vec![
            (
                "OUTPUT_STDOUT_PATH".to_string(),
                stdout_path.display().to_string(),
            ),
            (
                "OUTPUT_STDERR_PATH".to_string(),
                stderr_path.display().to_string(),
            ),
        ],
        stdout_path,
        stderr_path,
    };

    // Capturing into the script itself would truncate it before it runs
    let (launched, stdout, mut stderr) = if request.stdout_path == request.script_path
        || request.stderr_path == request.script_path
    {
        let fault = io::Error::new(
            io::ErrorKind::AlreadyExists,
            "output capture file would overwrite the script",
        );
        (Err(fault), Vec::new(), Vec::new())
    } else {
        let launched = ctx.launcher.launch(&request);
        (
            launched,
            read_capture(&request.stdout_path),
            read_capture(&request.stderr_path),
        )
    };

    let exit_status = match launched {
        Ok(code) => code,
        Err(e) => {
            warn!(
                script = %script.name,
                path = %request.script_path.display(),
                error = %e,
                "failed to launch script"
            );
            stderr.extend_from_slice(
                format!("Unable to run {}: {}\n", request.script_path.display(), e).as_bytes(),
            );
            launch_failure_status(&e)
        }
    };

    Ok(ScriptRunResult {
        exit_status,
        stdout,
        stderr,
        position,
        total,
    })
}

/// Missing capture files read back as empty output.
fn read_capture(path: &Path) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read captured output");
            Vec::new()
        }
    }
}

/// Shell conventions for a command that could not be run.
fn launch_failure_status(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::NotFound => EXIT_NOT_FOUND,
        io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
        _ => EXIT_LAUNCH_FAILED,
    }
}

/// Runs scripts as real child processes.
///
/// Output goes straight to the capture files. The child gets its own
/// process group and stays registered with `ChildRegistry` while it runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ScriptLauncher for SystemLauncher {
    fn launch(&self, request: &LaunchRequest) -> io::Result<i32> {
        let stdout = File::create(&request.stdout_path)?;
        let stderr = File::create(&request.stderr_path)?;

        debug!(
            path = %request.script_path.display(),
            cwd = %request.working_dir.display(),
            "spawning script"
        );
        let mut child = Command::new(&request.script_path)
            .current_dir(&request.working_dir)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .in_new_process_group()
            .spawn()?;

        let _registration = ChildRegistration::new(child.id());
        let status = child.wait()?;

        // Killed by a signal: report it the way a shell would
        Ok(status
            .code()
            .unwrap_or_else(|| 128 + status.signal().unwrap_or(0)))
    }
}
