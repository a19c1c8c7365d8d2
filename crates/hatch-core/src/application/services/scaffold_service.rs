//! Scaffold Service - main application orchestrator.
//!
//! This service coordinates the template workflow:
//! 1. Look the template up in the catalog
//! 2. Prepare the target directory
//! 3. Fetch the template (registry cache or staged snapshot)
//! 4. Install it with the strategy its metadata asks for

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{InstallJob, InstallReport, InstallStrategySelector, StagingDownloader};
use crate::application::ApplicationError;
use crate::application::ports::TemplateCatalog;
use crate::application::settings::STORE_DIR;
use crate::domain::{Deadline, DomainError, ProjectInfo, ProjectKind, TemplateInfo};
use crate::error::HatchResult;

/// Default location for `add`, relative to the working directory.
pub const DEFAULT_COMPONENT_DIR: &str = "src/components";

/// Create a project or component from a catalog template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRequest {
    pub kind: ProjectKind,
    pub name: String,
    pub version: String,
    /// Template name or canonical id.
    pub template: String,
    pub description: Option<String>,
    /// Empty a non-empty project directory instead of failing.
    pub force: bool,
    pub cwd: PathBuf,
}

/// Add a named component template under `base_dir/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRequest {
    pub name: String,
    pub base_dir: PathBuf,
}

/// Main scaffolding service.
pub struct ScaffoldService {
    catalog: Arc<dyn TemplateCatalog>,
    downloader: StagingDownloader,
    installer: InstallStrategySelector,
}

impl ScaffoldService {
    /// Create a new scaffold service with the given collaborators.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use hatch_core::application::ScaffoldService;
    ///
    /// let service = ScaffoldService::new(
    ///     catalog,    // Arc<dyn TemplateCatalog>
    ///     downloader, // StagingDownloader
    ///     installer,  // InstallStrategySelector
    /// );
    /// ```
    pub fn new(
        catalog: Arc<dyn TemplateCatalog>,
        downloader: StagingDownloader,
        installer: InstallStrategySelector,
    ) -> Self {
        Self {
            catalog,
            downloader,
            installer,
        }
    }

    /// Templates available for `kind`.
    pub fn list_templates(&self, kind: ProjectKind) -> HatchResult<Vec<TemplateInfo>> {
        let templates = self.catalog.fetch(kind)?;
        Ok(templates.into_iter().filter(|t| t.is_tagged(kind)).collect())
    }

    /// Create a project in `cwd/<name>`, or a component directly in `cwd`.
    #[instrument(skip_all, fields(kind = %request.kind, name = %request.name))]
    pub fn init(&self, request: &ProjectRequest, deadline: &Deadline) -> HatchResult<InstallReport> {
        let template = self.find_template(request.kind, &request.template)?;
        let mut project = ProjectInfo::new(
            request.kind,
            &request.name,
            &request.version,
            &template.canonical_id,
        )?;
        if let Some(description) = &request.description {
            project = project.with_description(description);
        }

        let (target, conflict_scan) = match request.kind {
            ProjectKind::Project => {
                let target = request.cwd.join(&request.name);
                check_project_dir(&target, request.force)?;
                (target, false)
            }
            ProjectKind::Component => (request.cwd.clone(), true),
        };

        info!(template = %template.canonical_id, target = %target.display(), "creating");
        let artifact = self.downloader.fetch(&template, &request.cwd, deadline)?;
        if request.kind == ProjectKind::Project {
            prepare_project_dir(&target, request.force)?;
        }
        self.installer.install(
            artifact,
            &InstallJob {
                template: &template,
                project: Some(&project),
                target: &target,
                conflict_scan,
            },
            deadline,
        )
    }

    /// Add a component template into `base_dir/<name>`. Files are copied
    /// verbatim; nothing is rendered.
    #[instrument(skip_all, fields(name = %request.name))]
    pub fn add_component(
        &self,
        request: &ComponentRequest,
        deadline: &Deadline,
    ) -> HatchResult<InstallReport> {
        let template = self.find_template(ProjectKind::Component, &request.name)?;

        let component_dir = request.base_dir.join(&request.name);
        if component_dir.exists() {
            return Err(ApplicationError::ComponentExists {
                path: component_dir,
            }
            .into());
        }

        let artifact = self.downloader.fetch(&template, &request.base_dir, deadline)?;
        self.installer.install(
            artifact,
            &InstallJob {
                template: &template,
                project: None,
                target: &component_dir,
                conflict_scan: false,
            },
            deadline,
        )
    }

    fn find_template(&self, kind: ProjectKind, wanted: &str) -> HatchResult<TemplateInfo> {
        let template = self
            .catalog
            .fetch(kind)?
            .into_iter()
            .find(|t| t.canonical_id == wanted || t.name == wanted)
            .ok_or_else(|| ApplicationError::TemplateNotFound {
                name: wanted.to_string(),
            })?;

        if !template.is_tagged(kind) {
            return Err(DomainError::TemplateKindMismatch {
                template: template.name,
                kind: kind.to_string(),
            }
            .into());
        }
        Ok(template)
    }
}

/// Ensure `dir` exists and is empty, ignoring dot-files and dependency trees.
/// Fail before any download when `dir` has content and `force` is off.
fn check_project_dir(dir: &Path, force: bool) -> HatchResult<()> {
    if !dir.is_dir() || force || is_effectively_empty(dir)? {
        return Ok(());
    }
    Err(ApplicationError::DirectoryNotEmpty {
        path: dir.to_path_buf(),
    }
    .into())
}

/// Create `dir` once the template is staged, emptying it under `force`.
fn prepare_project_dir(dir: &Path, force: bool) -> HatchResult<()> {
    fs::create_dir_all(dir).map_err(|e| ApplicationError::filesystem(dir, e))?;
    if is_effectively_empty(dir)? {
        return Ok(());
    }
    if !force {
        return Err(ApplicationError::DirectoryNotEmpty {
            path: dir.to_path_buf(),
        }
        .into());
    }

    warn!(path = %dir.display(), "emptying directory (--force)");
    let entries = fs::read_dir(dir).map_err(|e| ApplicationError::filesystem(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| ApplicationError::filesystem(dir, e))?.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| ApplicationError::filesystem(&path, e))?;
    }
    Ok(())
}

fn is_effectively_empty(dir: &Path) -> HatchResult<bool> {
    let entries = fs::read_dir(dir).map_err(|e| ApplicationError::filesystem(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ApplicationError::filesystem(dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with('.') && name != STORE_DIR {
            return Ok(false);
        }
    }
    Ok(true)
}
