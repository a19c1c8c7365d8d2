//! Installation strategies for a staged template.
//!
//! Each install walks a small state machine:
//!
//! ```text
//! Staged ─┬─> CopyAndRender ──┬─> Done
//!         └─> DelegateCustom ─┴─> Failed
//! ```
//!
//! The staged artifact is released on `Done`. On `Failed` it is dropped,
//! which removes a staging directory unless it is configured to be kept.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::render::list_files;
use super::subprocess::absolute;
use super::{
    EntryPointLocator, InvocationKind, RenderReport, RenderingPass, StagedArtifact,
    SubprocessInvoker, ensure_time,
};
use crate::application::ApplicationError;
use crate::application::ports::DependencyInstaller;
use crate::application::settings::STORE_DIR;
use crate::domain::{Deadline, InstallKind, ProjectInfo, TemplateInfo};
use crate::error::{Context, HatchResult};

/// How a template gets into its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// Copy the template tree, then render it in place.
    CopyAndRender,
    /// Run the template's own installer in a child process.
    DelegateCustom,
}

impl InstallStrategy {
    pub fn for_template(template: &TemplateInfo) -> Self {
        match template.install_kind {
            InstallKind::Normal => Self::CopyAndRender,
            InstallKind::Custom => Self::DelegateCustom,
        }
    }
}

impl fmt::Display for InstallStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CopyAndRender => write!(f, "copy and render"),
            Self::DelegateCustom => write!(f, "custom installer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstallState {
    Staged,
    CopyAndRender,
    DelegateCustom,
    Done,
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::CopyAndRender => "copy_and_render",
            Self::DelegateCustom => "delegate_custom",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(state: &mut InstallState, next: InstallState) {
    debug!(from = %state, to = %next, "install state");
    *state = next;
}

/// One install: which template, for which project, where.
#[derive(Debug, Clone, Copy)]
pub struct InstallJob<'a> {
    pub template: &'a TemplateInfo,
    /// Rendering context. Without it files are copied verbatim.
    pub project: Option<&'a ProjectInfo>,
    pub target: &'a Path,
    /// Refuse to copy when any staged file already exists under `target`.
    pub conflict_scan: bool,
}

/// What an install did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    pub strategy: InstallStrategy,
    pub copied: usize,
    pub render: Option<RenderReport>,
}

/// Picks and runs the install strategy for a staged template.
pub struct InstallStrategySelector {
    rendering: RenderingPass,
    dependencies: Arc<dyn DependencyInstaller>,
    locator: EntryPointLocator,
    invoker: SubprocessInvoker,
}

impl InstallStrategySelector {
    pub fn new(
        rendering: RenderingPass,
        dependencies: Arc<dyn DependencyInstaller>,
        invoker: SubprocessInvoker,
    ) -> Self {
        Self {
            rendering,
            dependencies,
            locator: EntryPointLocator::new(),
            invoker,
        }
    }

    /// Install `artifact` according to the template's install kind.
    #[instrument(skip_all, fields(template = %job.template.canonical_id, target = %job.target.display()))]
    pub fn install(
        &self,
        artifact: StagedArtifact,
        job: &InstallJob<'_>,
        deadline: &Deadline,
    ) -> HatchResult<InstallReport> {
        let mut state = InstallState::Staged;
        let strategy = InstallStrategy::for_template(job.template);

        let result = match strategy {
            InstallStrategy::CopyAndRender => {
                transition(&mut state, InstallState::CopyAndRender);
                self.copy_and_render(&artifact.copy_source(), job)
            }
            InstallStrategy::DelegateCustom => {
                transition(&mut state, InstallState::DelegateCustom);
                self.delegate_custom(&artifact, job, deadline)
                    .map(|()| InstallReport {
                        strategy,
                        copied: 0,
                        render: None,
                    })
            }
        };

        match result {
            Ok(report) => {
                artifact.finish()?;
                transition(&mut state, InstallState::Done);
                info!(%strategy, copied = report.copied, "template installed");
                Ok(report)
            }
            Err(e) => {
                transition(&mut state, InstallState::Failed);
                Err(e)
            }
        }
    }

    /// Copy `source` into the job's target, then render the copied files.
    ///
    /// With `conflict_scan` set, the first staged path that already exists
    /// under the target aborts the install before anything is written.
    pub fn copy_and_render(&self, source: &Path, job: &InstallJob<'_>) -> HatchResult<InstallReport> {
        if !source.is_dir() {
            return Err(ApplicationError::Manifest {
                path: source.to_path_buf(),
                reason: "template directory is missing".into(),
            }
            .into());
        }

        let files = list_files(source)?;
        if job.conflict_scan {
            if let Some(rel) = files.iter().find(|rel| job.target.join(rel).exists()) {
                return Err(ApplicationError::Conflict { path: rel.clone() }.into());
            }
        }

        for rel in &files {
            let to = job.target.join(rel);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| ApplicationError::filesystem(parent, e))?;
            }
            fs::copy(source.join(rel), &to).map_err(|e| ApplicationError::filesystem(&to, e))?;
        }
        debug!(files = files.len(), "copied");

        // Only the copied files; whatever the target already held stays as is.
        let render = match job.project {
            Some(project) => Some(self.rendering.render_files(
                job.target,
                &files,
                &job.template.ignore_patterns,
                &project.to_context(),
            )?),
            None => None,
        };

        Ok(InstallReport {
            strategy: InstallStrategy::CopyAndRender,
            copied: files.len(),
            render,
        })
    }

    /// Hand the install to the package's own entry point.
    ///
    /// A snapshot without a `node_modules` directory gets its dependencies
    /// installed first. The installer is called with
    /// `{templateInfo, projectInfo?, sourcePath, targetPath}`.
    pub fn delegate_custom(
        &self,
        artifact: &StagedArtifact,
        job: &InstallJob<'_>,
        deadline: &Deadline,
    ) -> HatchResult<()> {
        let root = artifact.content_root();
        if artifact.is_staged() && !root.join(STORE_DIR).exists() {
            info!(dir = %root.display(), "installing installer dependencies");
            self.dependencies.install(root, deadline)?;
        }

        ensure_time(deadline, "running the custom installer")?;
        let entry_point = self.locator.require(root)?;

        let mut options = Map::new();
        options.insert(
            "templateInfo".into(),
            serde_json::to_value(job.template).context("serializing template metadata")?,
        );
        if let Some(project) = job.project {
            options.insert("projectInfo".into(), project.to_context());
        }
        options.insert(
            "sourcePath".into(),
            Value::String(absolute(&artifact.template_dir()).display().to_string()),
        );
        options.insert(
            "targetPath".into(),
            Value::String(absolute(job.target).display().to_string()),
        );

        self.invoker
            .invoke(
                &entry_point,
                InvocationKind::Install,
                &Value::Object(options),
                root,
                deadline,
            )?
            .into_result(&entry_point)
    }
}
