//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `hatch-adapters` crate provides implementations.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::{Deadline, PackageRef, ProjectKind, TemplateInfo};
use crate::error::HatchResult;

/// Everything the registry install client needs to materialize packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Root the install runs from (the cache target path).
    pub root: PathBuf,
    /// Directory the packages land in, one cache entry each.
    pub store_dir: PathBuf,
    pub registry_url: String,
    pub packages: Vec<PackageRef>,
}

/// Port for a package registry.
///
/// Implemented by:
/// - `hatch_adapters::registry::NpmRegistry` (npm-compatible HTTP registry)
///
/// ## Contract
///
/// After `install` returns `Ok`, every requested package's cache entry under
/// `store_dir` is populated and importable. Failures are `Registry` errors.
#[cfg_attr(test, mockall::automock)]
pub trait PackageRegistry: Send + Sync {
    /// Highest published version of `name`.
    fn resolve_latest(&self, name: &str, deadline: &Deadline) -> HatchResult<String>;

    /// Materialize the requested packages and their dependency closure.
    fn install(&self, request: &InstallRequest, deadline: &Deadline) -> HatchResult<()>;
}

/// Port for source-control snapshots.
///
/// Implemented by:
/// - `hatch_adapters::snapshot::GitSnapshotDownloader`
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotDownloader: Send + Sync {
    /// Materialize a flat file tree for `locator` inside `destination`.
    fn download(&self, locator: &str, destination: &Path, deadline: &Deadline)
    -> HatchResult<()>;
}

/// Port for text rendering.
///
/// Implemented by:
/// - `hatch_adapters::renderer::PlaceholderEngine` (`<%= a.b %>` substitution)
///
/// The engine must support nested property access into `context`.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateEngine: Send + Sync {
    fn render(&self, source: &str, context: &Value) -> HatchResult<String>;
}

/// Port for the remote template list.
///
/// Implemented by:
/// - `hatch_adapters::catalog::HttpTemplateCatalog`
#[cfg_attr(test, mockall::automock)]
pub trait TemplateCatalog: Send + Sync {
    /// Templates tagged for `kind`.
    fn fetch(&self, kind: ProjectKind) -> HatchResult<Vec<TemplateInfo>>;
}

/// Port for installing a staged package's own dependencies.
///
/// Implemented by:
/// - `hatch_adapters::installer::CommandDependencyInstaller`
///
/// Blocking; the installer's output is inherited, not captured.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyInstaller: Send + Sync {
    fn install(&self, package_dir: &Path, deadline: &Deadline) -> HatchResult<()>;
}
