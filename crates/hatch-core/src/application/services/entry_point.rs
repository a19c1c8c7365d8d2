//! Entry point discovery from package manifests.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::application::ApplicationError;
use crate::error::HatchResult;

/// File name of a package manifest.
pub const MANIFEST: &str = "package.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    main: Option<String>,
}

/// Finds the module a package designates as its entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryPointLocator;

impl EntryPointLocator {
    pub fn new() -> Self {
        Self
    }

    /// Absolute path of the nearest manifest's `main` module, walking upward
    /// from `root`.
    ///
    /// Returns `None` when there is no manifest, no `main` field, or the
    /// manifest cannot be read. Callers read that as "nothing to execute".
    pub fn locate(&self, root: &Path) -> Option<PathBuf> {
        match self.resolve(root) {
            Ok(found) => found,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "no usable entry point");
                None
            }
        }
    }

    /// Like [`locate`](Self::locate), but an unreadable or malformed manifest
    /// is an error.
    pub fn resolve(&self, root: &Path) -> HatchResult<Option<PathBuf>> {
        let root = std::path::absolute(root).map_err(|e| ApplicationError::filesystem(root, e))?;
        let Some(manifest) = nearest_manifest(&root) else {
            return Ok(None);
        };

        let invalid = |reason: String| ApplicationError::Manifest {
            path: manifest.clone(),
            reason,
        };
        let raw = fs::read_to_string(&manifest).map_err(|e| invalid(e.to_string()))?;
        let parsed: Manifest = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        let Some(main) = parsed.main.filter(|m| !m.trim().is_empty()) else {
            return Ok(None);
        };
        let dir = manifest.parent().unwrap_or(Path::new("/"));
        Ok(Some(normalize(&dir.join(main))))
    }

    /// The entry point of a package that must have one.
    pub fn require(&self, root: &Path) -> HatchResult<PathBuf> {
        self.resolve(root)?.ok_or_else(|| {
            ApplicationError::Manifest {
                path: root.join(MANIFEST),
                reason: "no manifest with a \"main\" field".into(),
            }
            .into()
        })
    }
}

fn nearest_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST))
        .find(|candidate| candidate.is_file())
}

/// Lexical normalization: drops `.` and folds `..` without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
