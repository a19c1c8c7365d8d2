//! Resolves abstract version specifiers against the registry.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::ensure_time;
use crate::application::ports::PackageRegistry;
use crate::domain::{Deadline, DomainError, PackageSpec};
use crate::error::HatchResult;

/// Turns `"latest"` into a concrete semantic version.
///
/// Lookups are never retried here; whether a failure is fatal is the
/// caller's decision.
#[derive(Clone)]
pub struct VersionResolver {
    registry: Arc<dyn PackageRegistry>,
}

impl VersionResolver {
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self { registry }
    }

    /// Highest published version of `name`.
    #[instrument(skip(self, deadline))]
    pub fn resolve_latest(&self, name: &str, deadline: &Deadline) -> HatchResult<String> {
        ensure_time(deadline, "resolving the latest version")?;

        let version = self.registry.resolve_latest(name, deadline)?;
        if semver::Version::parse(&version).is_err() {
            return Err(DomainError::InvalidVersion {
                package: name.to_string(),
                version,
            }
            .into());
        }

        debug!(%version, "resolved latest");
        Ok(version)
    }

    /// Rebind `spec.version` in place when it is still `"latest"`.
    pub fn resolve(&self, spec: &mut PackageSpec, deadline: &Deadline) -> HatchResult<()> {
        if spec.is_latest() {
            let version = self.resolve_latest(spec.name(), deadline)?;
            spec.set_version(version);
        }
        Ok(())
    }
}
