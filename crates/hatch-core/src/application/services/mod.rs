//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish the
//! high-level use cases: "run plugin command X", "create a project from
//! template Y", "add component Z".

pub mod artifact_cache;
pub mod dispatcher;
pub mod entry_point;
pub mod install;
pub mod render;
pub mod scaffold_service;
pub mod staging;
pub mod subprocess;
pub mod version_resolver;

pub use artifact_cache::{ArtifactCache, InstallOutcome};
pub use dispatcher::{DEFAULT_PLUGINS, PluginDispatcher, PluginTable};
pub use entry_point::EntryPointLocator;
pub use install::{InstallJob, InstallReport, InstallStrategy, InstallStrategySelector};
pub use render::{BUILTIN_IGNORE, RenderReport, RenderingPass};
pub use scaffold_service::{ComponentRequest, DEFAULT_COMPONENT_DIR, ProjectRequest, ScaffoldService};
pub use staging::{STAGING_PREFIX, StagedArtifact, StagingDir, StagingDownloader};
pub use subprocess::{ExitOutcome, InvocationKind, SubprocessInvoker, wait_for};
pub use version_resolver::VersionResolver;

use crate::application::ApplicationError;
use crate::domain::Deadline;
use crate::error::HatchResult;

/// Fail fast when the caller's deadline has already passed.
pub(crate) fn ensure_time(deadline: &Deadline, step: &'static str) -> HatchResult<()> {
    if deadline.is_expired() {
        return Err(ApplicationError::DeadlineExceeded { step }.into());
    }
    Ok(())
}
