//! Template descriptions from the remote catalog.
//!
//! A [`TemplateInfo`] is read once per invocation from the catalog manifest
//! and never mutated afterwards. Field names on the wire follow the catalog
//! format (`npmName`, `type`, `isGit`, `ignore`, `tag`); the descriptive
//! names are accepted as aliases.
//!
//! ```json
//! {
//!   "name": "Vue admin",
//!   "npmName": "@acme/template-vue-admin",
//!   "version": "1.0.0",
//!   "type": "normal",
//!   "isGit": false,
//!   "ignore": ["public/**"],
//!   "tag": ["project"]
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::{DomainError, LATEST, PackageSpec, ProjectKind};

/// How a fetched template gets installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    /// Copy the template tree into the target and render it.
    #[default]
    Normal,
    /// Hand over to the template's own installer, run in a child process.
    Custom,
}

impl FromStr for InstallKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Ok(Self::Normal),
            "custom" => Ok(Self::Custom),
            other => Err(DomainError::UnknownInstallKind {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for InstallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

// A missing or null `type` means Normal; anything unrecognised is rejected.
fn lenient_install_kind<'de, D>(deserializer: D) -> Result<InstallKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.as_deref()
        .map_or(Ok(InstallKind::Normal), InstallKind::from_str)
        .map_err(serde::de::Error::custom)
}

fn default_version() -> String {
    LATEST.to_string()
}

/// One entry of the template catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Display name; also the lookup key for `hatch add <name>`.
    pub name: String,

    /// Registry package name or source-control locator.
    #[serde(rename = "npmName", alias = "canonicalId")]
    pub canonical_id: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(
        rename = "type",
        alias = "installKind",
        default,
        deserialize_with = "lenient_install_kind"
    )]
    pub install_kind: InstallKind,

    /// `true` when `canonical_id` is a source-control locator.
    #[serde(rename = "isGit", alias = "isRemoteRepo", default)]
    pub is_remote_repo: bool,

    /// Glob patterns (relative to the project root) the rendering pass skips.
    #[serde(rename = "ignore", alias = "ignorePatterns", default)]
    pub ignore_patterns: Vec<String>,

    /// `project` and/or `component`.
    #[serde(rename = "tag", alias = "tags", default)]
    pub tags: Vec<String>,
}

impl TemplateInfo {
    /// `true` if the template is offered for `kind`.
    pub fn is_tagged(&self, kind: ProjectKind) -> bool {
        self.tags.iter().any(|t| t == kind.as_str())
    }

    /// Registry package spec for this template, cached under `store_dir`.
    pub fn package_spec(
        &self,
        target_path: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
    ) -> Result<PackageSpec, DomainError> {
        Ok(PackageSpec::new(&self.canonical_id, &self.version, target_path)?
            .with_store_dir(store_dir))
    }
}
