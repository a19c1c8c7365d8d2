//! Command handlers. Each turns parsed arguments into calls on the core
//! services and reports the outcome.

pub mod add;
pub mod completions;
pub mod config;
pub mod init;
pub mod list;
pub mod plugin;

use std::path::PathBuf;

use crate::error::{CliResult, IntoCli};

fn current_dir() -> CliResult<PathBuf> {
    std::env::current_dir().with_cli_context(|| "reading the current directory")
}
