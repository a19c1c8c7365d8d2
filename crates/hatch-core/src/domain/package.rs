//! Package identities and their cache addresses.
//!
//! A [`PackageSpec`] names a registry package and the version wanted. Once the
//! version is concrete, the package maps to exactly one cache directory:
//!
//! ```text
//! <store_dir>/_<escaped name>@<version>@<name>/
//! ```
//!
//! The mapping is a pure function of `(store_dir, name, version)`. The cache is
//! addressed by name and version, never by content hash, so two specs with the
//! same triple always share the same directory.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::DomainError;

/// Version specifier that asks the registry for its newest release.
pub const LATEST: &str = "latest";

/// A `(name, version)` pair as handed to the registry install client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A package to resolve, cache, and load.
///
/// Everything but `version` is fixed at construction. `version` starts as
/// either a concrete semantic version or [`LATEST`] and is rebound in place
/// when "latest" is resolved or an update finds a newer release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    name: String,
    version: String,
    target_path: PathBuf,
    store_dir: Option<PathBuf>,
}

impl PackageSpec {
    /// Create a spec with no store directory (the package lives at `target_path`).
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target_path: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let version = version.into();
        validate_package_name(&name)?;
        validate_version(&name, &version)?;

        Ok(Self {
            name,
            version,
            target_path: target_path.into(),
            store_dir: None,
        })
    }

    /// Attach a store directory, turning it into a cached package.
    pub fn with_store_dir(mut self, store_dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(store_dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn store_dir(&self) -> Option<&Path> {
        self.store_dir.as_deref()
    }

    /// `true` while the version is still the abstract "latest" specifier.
    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }

    /// Rebind the version after resolution or update.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// The `(name, version)` pair for the install client.
    pub fn package_ref(&self) -> PackageRef {
        PackageRef::new(&self.name, &self.version)
    }

    /// Cache directory for the current version.
    ///
    /// Returns `None` for specs without a store directory and
    /// [`DomainError::UnresolvedVersion`] while the version is still "latest".
    pub fn cache_entry(&self) -> Result<Option<PathBuf>, DomainError> {
        let Some(store_dir) = &self.store_dir else {
            return Ok(None);
        };
        if self.is_latest() {
            return Err(DomainError::UnresolvedVersion {
                package: self.name.clone(),
            });
        }
        Ok(Some(cache_path(store_dir, &self.name, &self.version)))
    }

    /// Directory holding the package contents: the cache entry for cached
    /// packages, the target path otherwise.
    pub fn package_root(&self) -> Result<PathBuf, DomainError> {
        Ok(self
            .cache_entry()?
            .unwrap_or_else(|| self.target_path.clone()))
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Deterministic cache directory for `(store_dir, name, version)`.
pub fn cache_path(store_dir: &Path, name: &str, version: &str) -> PathBuf {
    store_dir.join(format!(
        "_{}@{}@{}",
        escape_package_name(name),
        version,
        name
    ))
}

/// Escape a package name for use as a path prefix.
///
/// Only the scope separator is replaced: `@scope/pkg` becomes `@scope_pkg`.
pub fn escape_package_name(name: &str) -> String {
    name.replacen('/', "_", 1)
}

fn validate_package_name(name: &str) -> Result<(), DomainError> {
    let invalid = |reason: &str| DomainError::InvalidPackageName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '\\') {
        return Err(invalid("name cannot contain whitespace or backslashes"));
    }
    if name.starts_with('.') || name.contains("..") {
        return Err(invalid("name cannot start with '.' or contain '..'"));
    }
    match name.matches('/').count() {
        0 => Ok(()),
        1 if name.starts_with('@') && !name.ends_with('/') => Ok(()),
        _ => Err(invalid("only scoped names (@scope/name) may contain '/'")),
    }
}

fn validate_version(name: &str, version: &str) -> Result<(), DomainError> {
    if version == LATEST || semver::Version::parse(version).is_ok() {
        Ok(())
    } else {
        Err(DomainError::InvalidVersion {
            package: name.to_string(),
            version: version.to_string(),
        })
    }
}
