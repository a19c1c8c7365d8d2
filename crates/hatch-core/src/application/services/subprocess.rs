//! One-shot isolated process invocation.
//!
//! ## Protocol
//!
//! The child is started as `<runtime.program> <runtime.args...> <entry point>`
//! with two environment variables:
//!
//! - `HATCH_ENTRY_POINT`: absolute path of the module to load
//! - `HATCH_PAYLOAD`: path of a JSON file holding
//!   `{"kind": "install" | "command", "entryPoint": ..., "payload": ...}`
//!
//! The runtime's fixed bootstrap reads the file and calls the module with
//! `payload`. Nothing is interpolated into code; stdio is inherited so the
//! child's output shows up live.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use super::ensure_time;
use crate::application::{ApplicationError, RuntimeConfig};
use crate::domain::Deadline;
use crate::error::{Context, HatchResult};

pub const ENV_ENTRY_POINT: &str = "HATCH_ENTRY_POINT";
pub const ENV_PAYLOAD: &str = "HATCH_PAYLOAD";

const WAIT_POLL: Duration = Duration::from_millis(50);

/// What the child is being asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationKind {
    /// A custom template installer, called with an options object.
    Install,
    /// A plugin subcommand, called with the forwarded argument list.
    Command,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    kind: InvocationKind,
    entry_point: &'a Path,
    payload: &'a Value,
}

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    code: Option<i32>,
}

impl ExitOutcome {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }

    /// Exit code, or `None` when the child was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `Ok` on a zero exit, otherwise an `InstallerProcess` error.
    pub fn into_result(self, entry_point: &Path) -> HatchResult<()> {
        if self.success() {
            return Ok(());
        }
        Err(ApplicationError::InstallerProcess {
            entry_point: entry_point.to_path_buf(),
            code: self.code,
        }
        .into())
    }
}

/// Runs package entry points in a child process.
#[derive(Debug, Clone)]
pub struct SubprocessInvoker {
    runtime: RuntimeConfig,
}

impl SubprocessInvoker {
    pub fn new(runtime: RuntimeConfig) -> Self {
        Self { runtime }
    }

    /// Run `entry_point` with `payload` and wait for it.
    ///
    /// Spawn and wait failures are `Subprocess` errors. A child still running
    /// when `deadline` expires is killed.
    #[instrument(skip(self, payload, deadline), fields(entry = %entry_point.display()))]
    pub fn invoke(
        &self,
        entry_point: &Path,
        kind: InvocationKind,
        payload: &Value,
        cwd: &Path,
        deadline: &Deadline,
    ) -> HatchResult<ExitOutcome> {
        ensure_time(deadline, "starting the child process")?;

        let payload_file = write_envelope(&Envelope {
            kind,
            entry_point,
            payload,
        })?;

        debug!(
            program = %self.runtime.program,
            payload = %payload_file.path().display(),
            "spawning"
        );
        let mut child = Command::new(&self.runtime.program)
            .args(&self.runtime.args)
            .arg(entry_point)
            .env(ENV_ENTRY_POINT, entry_point)
            .env(ENV_PAYLOAD, payload_file.path())
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let status = wait_for(
            &mut child,
            &self.runtime.program,
            deadline,
            "waiting for the child process",
        )?;
        let outcome = ExitOutcome::from_status(status);
        debug!(code = ?outcome.code(), "child exited");
        Ok(outcome)
    }

    fn spawn_error(&self, e: std::io::Error) -> ApplicationError {
        ApplicationError::Subprocess {
            program: self.runtime.program.clone(),
            reason: e.to_string(),
        }
    }
}

fn write_envelope(envelope: &Envelope<'_>) -> HatchResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("hatch-payload-")
        .suffix(".json")
        .tempfile()
        .context("creating the payload file")?;
    serde_json::to_writer(&mut file, envelope).context("serializing the payload")?;
    file.flush().context("writing the payload file")?;
    Ok(file)
}

/// Wait for `child`, killing it if `deadline` expires first.
///
/// Wait failures are `Subprocess` errors naming `program`; an expired
/// deadline is `DeadlineExceeded { step }`.
pub fn wait_for(
    child: &mut Child,
    program: &str,
    deadline: &Deadline,
    step: &'static str,
) -> HatchResult<ExitStatus> {
    let wait_error = |e: std::io::Error| ApplicationError::Subprocess {
        program: program.to_string(),
        reason: e.to_string(),
    };

    if deadline.remaining().is_none() {
        return Ok(child.wait().map_err(wait_error)?);
    }
    loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            return Ok(status);
        }
        if deadline.is_expired() {
            warn!(pid = child.id(), program, "deadline expired; killing child");
            let _ = child.kill();
            let _ = child.wait();
            return Err(ApplicationError::DeadlineExceeded { step }.into());
        }
        thread::sleep(deadline.clamp(WAIT_POLL));
    }
}

/// Absolute form of `path` for handing to a child process.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
