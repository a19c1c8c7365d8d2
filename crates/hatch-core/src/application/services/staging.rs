//! Staging area for freshly fetched artifacts.
//!
//! Snapshots land in `<parent>/.staging-<unix millis>`, a directory owned
//! by exactly one operation. [`StagingDir`] removes it when dropped, on every
//! exit path; with `keep_staging_on_failure` set, a directory whose operation
//! never completed is left behind for inspection instead.
//!
//! Registry templates are not copied into a staging directory: their cache
//! entry is read in place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::{ArtifactCache, ensure_time};
use crate::application::ports::SnapshotDownloader;
use crate::application::{ApplicationError, CoreSettings};
use crate::domain::{Deadline, TemplateInfo};
use crate::error::HatchResult;

/// Name prefix of every staging directory.
pub const STAGING_PREFIX: &str = ".staging-";

/// Subdirectory of a package that holds its template files.
const TEMPLATE_SUBDIR: &str = "template";

/// Scoped owner of one staging directory.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    keep_on_failure: bool,
    released: bool,
}

impl StagingDir {
    /// Create a fresh, uniquely named staging directory under `parent`.
    pub fn create(parent: &Path, keep_on_failure: bool) -> HatchResult<Self> {
        fs::create_dir_all(parent).map_err(|e| ApplicationError::filesystem(parent, e))?;

        let mut millis = Utc::now().timestamp_millis();
        loop {
            let path = parent.join(format!("{STAGING_PREFIX}{millis}"));
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "staging directory created");
                    return Ok(Self {
                        path,
                        keep_on_failure,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(ApplicationError::filesystem(&path, e).into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failures.
    ///
    /// Marks the owning operation as completed, so the directory is removed
    /// even when `keep_on_failure` is set.
    pub fn close(mut self) -> HatchResult<()> {
        self.released = true;
        remove_tree(&self.path).map_err(|e| ApplicationError::filesystem(&self.path, e).into())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.keep_on_failure {
            warn!(path = %self.path.display(), "operation failed; keeping staging directory");
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
        }
    }
}

fn remove_tree(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A fetched template or plugin, ready to be installed.
#[derive(Debug)]
pub enum StagedArtifact {
    /// Source-control snapshot in its own staging directory.
    Staged(StagingDir),
    /// Registry package read straight from its cache entry.
    Cached { package_root: PathBuf },
}

impl StagedArtifact {
    /// Root of the fetched package (where its manifest lives).
    pub fn content_root(&self) -> &Path {
        match self {
            Self::Staged(dir) => dir.path(),
            Self::Cached { package_root } => package_root,
        }
    }

    /// The package's `template` subdirectory.
    pub fn template_dir(&self) -> PathBuf {
        self.content_root().join(TEMPLATE_SUBDIR)
    }

    /// The tree a plain copy install reads from: the whole snapshot, or the
    /// cached package's `template` subdirectory.
    pub fn copy_source(&self) -> PathBuf {
        match self {
            Self::Staged(dir) => dir.path().to_path_buf(),
            Self::Cached { .. } => self.template_dir(),
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, Self::Staged(_))
    }

    /// Release the artifact after a successful install.
    pub fn finish(self) -> HatchResult<()> {
        match self {
            Self::Staged(dir) => dir.close(),
            Self::Cached { .. } => Ok(()),
        }
    }
}

/// Fetches template artifacts from the registry cache or a snapshot source.
pub struct StagingDownloader {
    snapshots: Arc<dyn SnapshotDownloader>,
    cache: Arc<ArtifactCache>,
    template_cache: (PathBuf, PathBuf),
    keep_on_failure: bool,
}

impl StagingDownloader {
    pub fn new(
        snapshots: Arc<dyn SnapshotDownloader>,
        cache: Arc<ArtifactCache>,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            snapshots,
            cache,
            template_cache: settings.template_cache(),
            keep_on_failure: settings.keep_staging_on_failure,
        }
    }

    /// Fetch `template`. Snapshots are staged under `destination_parent`.
    #[instrument(skip_all, fields(template = %template.canonical_id, remote = template.is_remote_repo))]
    pub fn fetch(
        &self,
        template: &TemplateInfo,
        destination_parent: &Path,
        deadline: &Deadline,
    ) -> HatchResult<StagedArtifact> {
        ensure_time(deadline, "fetching the template")?;

        if template.is_remote_repo {
            let staging = StagingDir::create(destination_parent, self.keep_on_failure)?;
            self.snapshots
                .download(&template.canonical_id, staging.path(), deadline)?;
            info!(path = %staging.path().display(), "snapshot staged");
            return Ok(StagedArtifact::Staged(staging));
        }

        let (target, store) = &self.template_cache;
        let mut spec = template.package_spec(target, store)?;
        if self.cache.exists(&mut spec, deadline)? {
            self.cache.update(&mut spec, deadline)?;
        } else {
            self.cache.install(&mut spec, deadline)?;
        }

        let package_root = spec.package_root()?;
        if !package_root.is_dir() {
            return Err(ApplicationError::Registry {
                package: spec.to_string(),
                reason: "package is not in the cache after install".into(),
            }
            .into());
        }
        info!(path = %package_root.display(), "template cached");
        Ok(StagedArtifact::Cached { package_root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockPackageRegistry, MockSnapshotDownloader};
    use crate::domain::cache_path;
    use tempfile::TempDir;

    fn template(remote: bool) -> TemplateInfo {
        let id = if remote { "acme/vue-admin" } else { "@acme/vue-admin" };
        serde_json::from_value(serde_json::json!({
            "name": "Vue admin",
            "npmName": id,
            "version": "1.0.0",
            "isGit": remote,
        }))
        .unwrap()
    }

    fn downloader(
        home: &Path,
        snapshots: MockSnapshotDownloader,
        registry: MockPackageRegistry,
    ) -> StagingDownloader {
        let settings = CoreSettings::new(home);
        let cache = Arc::new(ArtifactCache::new(Arc::new(registry), &settings));
        StagingDownloader::new(Arc::new(snapshots), cache, &settings)
    }

    #[test]
    fn staging_dir_is_named_and_removed_on_drop() {
        let parent = TempDir::new().unwrap();
        let path = {
            let staging = StagingDir::create(parent.path(), false).unwrap();
            let name = staging.path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(STAGING_PREFIX));
            assert!(name[STAGING_PREFIX.len()..].parse::<i64>().is_ok());
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn kept_on_failure_when_configured() {
        let parent = TempDir::new().unwrap();
        let staging = StagingDir::create(parent.path(), true).unwrap();
        let path = staging.path().to_path_buf();
        drop(staging);
        assert!(path.exists());
    }

    #[test]
    fn close_removes_even_when_keeping() {
        let parent = TempDir::new().unwrap();
        let staging = StagingDir::create(parent.path(), true).unwrap();
        let path = staging.path().to_path_buf();
        fs::write(path.join("README.md"), "x").unwrap();
        staging.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn two_staging_dirs_never_collide() {
        let parent = TempDir::new().unwrap();
        let a = StagingDir::create(parent.path(), false).unwrap();
        let b = StagingDir::create(parent.path(), false).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn remote_templates_are_snapshotted_into_staging() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let mut snapshots = MockSnapshotDownloader::new();
        snapshots
            .expect_download()
            .withf(|locator, _, _| locator == "acme/vue-admin")
            .times(1)
            .returning(|_, dest, _| {
                fs::write(dest.join("README.md"), "hi").unwrap();
                Ok(())
            });
        let mut registry = MockPackageRegistry::new();
        registry.expect_install().times(0);

        let artifact = downloader(home.path(), snapshots, registry)
            .fetch(&template(true), cwd.path(), &Deadline::none())
            .unwrap();

        assert!(artifact.is_staged());
        assert!(artifact.copy_source().join("README.md").is_file());
        assert_eq!(artifact.copy_source().parent(), Some(cwd.path()));
    }

    #[test]
    fn failed_snapshot_leaves_no_staging_dir() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let mut snapshots = MockSnapshotDownloader::new();
        snapshots.expect_download().returning(|locator, _, _| {
            Err(ApplicationError::Download {
                locator: locator.into(),
                reason: "404".into(),
            }
            .into())
        });

        let result = downloader(home.path(), snapshots, MockPackageRegistry::new()).fetch(
            &template(true),
            cwd.path(),
            &Deadline::none(),
        );

        assert!(result.is_err());
        assert_eq!(fs::read_dir(cwd.path()).unwrap().count(), 0);
    }

    #[test]
    fn registry_templates_are_read_from_the_cache() {
        let home = TempDir::new().unwrap();
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_resolve_latest()
            .returning(|_, _| Ok("1.0.0".into()));
        registry.expect_install().times(1).returning(|req, _| {
            let entry = cache_path(&req.store_dir, "@acme/vue-admin", "1.0.0");
            fs::create_dir_all(entry.join(TEMPLATE_SUBDIR)).unwrap();
            Ok(())
        });

        let artifact = downloader(home.path(), MockSnapshotDownloader::new(), registry)
            .fetch(&template(false), home.path(), &Deadline::none())
            .unwrap();

        let expected = home
            .path()
            .join("template/node_modules/_@acme_vue-admin@1.0.0@@acme/vue-admin");
        assert_eq!(artifact.content_root(), expected);
        assert_eq!(artifact.copy_source(), expected.join(TEMPLATE_SUBDIR));
    }

    #[test]
    fn degraded_template_install_is_an_error() {
        let home = TempDir::new().unwrap();
        let mut registry = MockPackageRegistry::new();
        registry.expect_install().returning(|_, _| {
            Err(ApplicationError::Registry {
                package: "@acme/vue-admin".into(),
                reason: "offline".into(),
            }
            .into())
        });

        let err = downloader(home.path(), MockSnapshotDownloader::new(), registry)
            .fetch(&template(false), home.path(), &Deadline::none())
            .unwrap_err();
        assert!(err.to_string().contains("not in the cache"));
    }
}
