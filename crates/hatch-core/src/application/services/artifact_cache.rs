//! Version-addressed package cache.
//!
//! A cache entry is the directory
//! `<store_dir>/_<escaped name>@<version>@<name>`; its path depends only on
//! the store directory, the package name and the resolved version. Installs
//! into one entry are serialized across processes by an advisory lock file
//! next to it (`<entry>.lock`).

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use super::{VersionResolver, ensure_time};
use crate::application::ports::{InstallRequest, PackageRegistry};
use crate::application::{ApplicationError, CoreSettings};
use crate::domain::{Deadline, PackageSpec};
use crate::error::{HatchError, HatchResult};

const LOCK_POLL: Duration = Duration::from_millis(100);

/// Result of an install or update that did not raise.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallOutcome {
    /// The entry was populated by this call.
    Installed,
    /// The entry was already on disk; nothing was fetched.
    Present,
    /// The registry install failed and lenient mode logged it instead of
    /// raising. The entry is not populated.
    Degraded(HatchError),
}

impl InstallOutcome {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Degraded(_))
    }
}

/// Drives resolution and installs for the on-disk package cache.
pub struct ArtifactCache {
    resolver: VersionResolver,
    registry: Arc<dyn PackageRegistry>,
    registry_url: String,
    strict: bool,
    lock_timeout: Duration,
}

impl ArtifactCache {
    pub fn new(registry: Arc<dyn PackageRegistry>, settings: &CoreSettings) -> Self {
        Self {
            resolver: VersionResolver::new(Arc::clone(&registry)),
            registry,
            registry_url: settings.registry_url.clone(),
            strict: settings.strict_install,
            lock_timeout: settings.lock_timeout,
        }
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Whether the package is on disk.
    ///
    /// Resolves `"latest"` first and rebinds `spec.version`, so repeated
    /// calls with the same spec do not hit the registry again. Specs without
    /// a store directory point at a plain local directory.
    #[instrument(skip_all, fields(package = %spec.name()))]
    pub fn exists(&self, spec: &mut PackageSpec, deadline: &Deadline) -> HatchResult<bool> {
        if spec.store_dir().is_none() {
            return Ok(spec.target_path().is_dir());
        }

        self.resolver.resolve(spec, deadline)?;
        let present = spec.package_root()?.is_dir();
        debug!(version = %spec.version(), present, "cache lookup");
        Ok(present)
    }

    /// Materialize the package under its cache entry.
    ///
    /// Registry install failures are logged at debug level and reported as
    /// [`InstallOutcome::Degraded`] unless strict mode is on, in which case
    /// they are returned as errors. Resolution failures always propagate.
    #[instrument(skip_all, fields(package = %spec.name()))]
    pub fn install(
        &self,
        spec: &mut PackageSpec,
        deadline: &Deadline,
    ) -> HatchResult<InstallOutcome> {
        let Some(store_dir) = spec.store_dir().map(Path::to_path_buf) else {
            return Ok(InstallOutcome::Present);
        };

        ensure_time(deadline, "preparing the package cache")?;
        fs::create_dir_all(&store_dir).map_err(|e| ApplicationError::filesystem(&store_dir, e))?;
        self.resolver.resolve(spec, deadline)?;

        let entry = spec.package_root()?;
        let _lock = CacheLock::acquire(&entry, self.lock_timeout, deadline)?;
        if entry.is_dir() {
            debug!(entry = %entry.display(), "installed by another process while waiting");
            return Ok(InstallOutcome::Present);
        }

        let request = InstallRequest {
            root: spec.target_path().to_path_buf(),
            store_dir,
            registry_url: self.registry_url.clone(),
            packages: vec![spec.package_ref()],
        };

        info!(package = %spec, "installing");
        match self.registry.install(&request, deadline) {
            Ok(()) => Ok(InstallOutcome::Installed),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!(error = %e, "install failed; continuing without the package");
                Ok(InstallOutcome::Degraded(e))
            }
        }
    }

    /// Move `spec` to the newest published version.
    ///
    /// An existing entry for that version counts as up to date: nothing is
    /// re-fetched or re-checked. Otherwise the new version is installed and
    /// `spec.version` is rebound once it is on disk; a degraded install keeps
    /// the previous version. A failed lookup on an already pinned spec is
    /// treated like a degraded install.
    #[instrument(skip_all, fields(package = %spec.name()))]
    pub fn update(&self, spec: &mut PackageSpec, deadline: &Deadline) -> HatchResult<InstallOutcome> {
        if spec.store_dir().is_none() {
            return Ok(InstallOutcome::Present);
        }

        let latest = match self.resolver.resolve_latest(spec.name(), deadline) {
            Ok(version) => version,
            Err(e) if self.strict || spec.is_latest() => return Err(e),
            Err(e) => {
                debug!(error = %e, "update check failed; keeping {}", spec.version());
                return Ok(InstallOutcome::Degraded(e));
            }
        };

        let mut candidate = spec.clone();
        candidate.set_version(&latest);
        if candidate.package_root()?.is_dir() {
            debug!(version = %latest, "already up to date");
            spec.set_version(latest);
            return Ok(InstallOutcome::Present);
        }

        let outcome = self.install(&mut candidate, deadline)?;
        if outcome.is_available() {
            spec.set_version(latest);
        }
        Ok(outcome)
    }
}

/// Exclusive lock file guarding one cache entry. Removed on drop.
struct CacheLock {
    path: PathBuf,
}

impl CacheLock {
    fn acquire(entry: &Path, timeout: Duration, deadline: &Deadline) -> HatchResult<Self> {
        let path = lock_path(entry);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ApplicationError::filesystem(parent, e))?;
        }

        let wait = deadline.clamp(timeout);
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if started.elapsed() >= wait {
                        ensure_time(deadline, "waiting for the cache lock")?;
                        return Err(ApplicationError::CacheLocked {
                            path: entry.to_path_buf(),
                        }
                        .into());
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(ApplicationError::filesystem(&path, e).into()),
            }
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release cache lock");
        }
    }
}

fn lock_path(entry: &Path) -> PathBuf {
    let mut name = entry.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
