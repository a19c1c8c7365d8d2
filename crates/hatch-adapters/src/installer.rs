//! Dependency installation for staged packages.

use std::path::Path;
use std::process::Command;

use tracing::{info, instrument};

use hatch_core::application::ports::DependencyInstaller;
use hatch_core::domain::Deadline;
use hatch_core::error::HatchResult;

use crate::process;

/// Runs a package manager (`pnpm install` by default) inside the package.
///
/// Output goes straight to the user's terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDependencyInstaller {
    program: String,
    args: Vec<String>,
}

impl CommandDependencyInstaller {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Default for CommandDependencyInstaller {
    fn default() -> Self {
        Self::new("pnpm", vec!["install".into()])
    }
}

impl DependencyInstaller for CommandDependencyInstaller {
    #[instrument(skip(self, deadline), fields(program = %self.program))]
    fn install(&self, package_dir: &Path, deadline: &Deadline) -> HatchResult<()> {
        info!(dir = %package_dir.display(), "installing template dependencies");
        let status = process::run(
            Command::new(&self.program)
                .args(&self.args)
                .current_dir(package_dir),
            deadline,
            "installing template dependencies",
        )?;
        process::check(&self.program, status)
    }
}
