//! Application layer errors.
//!
//! These errors represent failures in the pipeline (network, filesystem,
//! child processes), not validation of domain values. Domain validation
//! errors are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while acquiring, caching, installing, or running packages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// Registry lookup or install failed (network, unknown package, bad response).
    #[error("Registry error for '{package}': {reason}")]
    Registry { package: String, reason: String },

    /// A staged file would overwrite an existing file in the target.
    #[error("Conflicting file already exists: {path}")]
    Conflict { path: PathBuf },

    /// Missing or invalid package manifest / entry point.
    #[error("Invalid package manifest at {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    /// The delegated installer or plugin process exited unsuccessfully.
    #[error("Installer process {entry_point} failed{}", exit_suffix(.code))]
    InstallerProcess {
        entry_point: PathBuf,
        code: Option<i32>,
    },

    /// A child process could not be spawned or waited on.
    #[error("Failed to run '{program}': {reason}")]
    Subprocess { program: String, reason: String },

    /// Snapshot fetch or archive extraction failed.
    #[error("Download of '{locator}' failed: {reason}")]
    Download { locator: String, reason: String },

    /// The template catalog could not be fetched or parsed.
    #[error("Template catalog unavailable: {reason}")]
    Catalog { reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    Filesystem { path: PathBuf, reason: String },

    /// A file failed to render.
    #[error("Rendering {path} failed: {reason}")]
    Rendering { path: PathBuf, reason: String },

    /// The caller's deadline expired.
    #[error("Deadline exceeded while {step}")]
    DeadlineExceeded { step: &'static str },

    /// Another process holds the cache entry lock.
    #[error("Cache entry is locked by another process: {path}")]
    CacheLocked { path: PathBuf },

    /// Subcommand has no plugin registered.
    #[error("Unknown command '{name}'")]
    UnknownCommand { name: String, available: Vec<String> },

    /// No catalog template matches the requested name.
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// Target directory has content and `--force` was not given.
    #[error("Directory is not empty: {path}")]
    DirectoryNotEmpty { path: PathBuf },

    /// Component directory already exists.
    #[error("Component already exists: {path}")]
    ComponentExists { path: PathBuf },
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map_or_else(
        || " (terminated by signal)".to_string(),
        |c| format!(" with exit code {c}"),
    )
}

impl ApplicationError {
    pub fn filesystem(path: impl Into<PathBuf>, e: impl std::fmt::Display) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: e.to_string(),
        }
    }

    /// Exit code of the failed child process, when there was one.
    pub fn child_exit_code(&self) -> Option<i32> {
        match self {
            Self::InstallerProcess { code, .. } => *code,
            _ => None,
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Registry { package, .. } => vec![
                format!("Could not reach the registry for '{}'", package),
                "Check your network connection and registry URL".into(),
                "Re-run the command to retry".into(),
            ],
            Self::Conflict { path } => vec![
                format!("'{}' would be overwritten", path.display()),
                "Move or delete the existing file, then retry".into(),
            ],
            Self::Manifest { .. } => vec![
                "The package has no usable package.json 'main' entry".into(),
                "Ask the template or plugin author to fix the manifest".into(),
            ],
            Self::InstallerProcess { .. } => vec![
                "The template's installer failed".into(),
                "Check the installer output above for details".into(),
            ],
            Self::Subprocess { program, .. } => vec![
                format!("Ensure '{}' is installed and on your PATH", program),
                "Or set runtime.program in the configuration".into(),
            ],
            Self::Download { .. } => vec![
                "Check the template locator and your network connection".into(),
                "Re-run the command to retry".into(),
            ],
            Self::Catalog { .. } => vec![
                "Check BASE_URL and PROJECT_TEMPLATE: hatch config get".into(),
                "Set them with: hatch config set BASE_URL <url>".into(),
            ],
            Self::DeadlineExceeded { .. } => vec![
                "Increase the timeout with --timeout <SECONDS>".into(),
                "Or run without a timeout".into(),
            ],
            Self::CacheLocked { path } => vec![
                "Another hatch process is installing the same package".into(),
                format!(
                    "If none is running, remove the stale lock: {}.lock",
                    path.display()
                ),
            ],
            Self::UnknownCommand { available, .. } => vec![
                format!("Available commands: {}", available.join(", ")),
                "Use --help for usage information".into(),
            ],
            Self::TemplateNotFound { .. } => vec![
                "List available templates: hatch list".into(),
            ],
            Self::DirectoryNotEmpty { .. } => vec![
                "Use --force to empty the directory first (destructive)".into(),
                "Choose a different project name".into(),
            ],
            Self::ComponentExists { path } => vec![
                format!("Remove '{}' or choose another name", path.display()),
            ],
            Self::Filesystem { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::Rendering { .. } => vec![
                "Fix the placeholder in the file above".into(),
                "Files rendered before the failure keep their new content".into(),
            ],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Registry { .. } | Self::Download { .. } | Self::Catalog { .. } => {
                ErrorCategory::Network
            }
            Self::Conflict { .. }
            | Self::DirectoryNotEmpty { .. }
            | Self::ComponentExists { .. }
            | Self::CacheLocked { .. } => ErrorCategory::Conflict,
            Self::Manifest { .. } => ErrorCategory::Manifest,
            Self::InstallerProcess { .. } | Self::Subprocess { .. } => ErrorCategory::Process,
            Self::UnknownCommand { .. } | Self::TemplateNotFound { .. } => ErrorCategory::NotFound,
            Self::DeadlineExceeded { .. } => ErrorCategory::Network,
            Self::Filesystem { .. } | Self::Rendering { .. } => ErrorCategory::Internal,
        }
    }
}
