//! Child processes run to completion under a deadline.

use std::process::{Command, ExitStatus};

use tracing::debug;

use hatch_core::application::{ApplicationError, wait_for};
use hatch_core::domain::Deadline;
use hatch_core::error::HatchResult;

/// Spawn `command` and wait for it, killing it if `deadline` expires first.
///
/// Spawn failures are `Subprocess` errors; an expired deadline is
/// `DeadlineExceeded { step }`. The exit status is returned as is.
pub fn run(command: &mut Command, deadline: &Deadline, step: &'static str) -> HatchResult<ExitStatus> {
    let program = command.get_program().to_string_lossy().into_owned();
    if deadline.is_expired() {
        return Err(ApplicationError::DeadlineExceeded { step }.into());
    }

    debug!(program = %program, "spawning");
    let mut child = command.spawn().map_err(|e| ApplicationError::Subprocess {
        program: program.clone(),
        reason: e.to_string(),
    })?;
    wait_for(&mut child, &program, deadline, step)
}

/// Turn a non-zero exit into a `Subprocess` error.
pub fn check(program: &str, status: ExitStatus) -> HatchResult<()> {
    if status.success() {
        return Ok(());
    }
    let reason = match status.code() {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by a signal".to_string(),
    };
    Err(ApplicationError::Subprocess {
        program: program.to_string(),
        reason,
    }
    .into())
}
