//! Template catalog served as a JSON document.
//!
//! The catalog is a JSON array of template descriptors at
//! `<base_url>/<path>`, with one path for project templates and one for
//! component templates. A base without an `http(s)://` scheme is read from
//! the local filesystem instead, which is how offline mirrors and tests
//! provide a catalog.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, instrument};

use hatch_core::application::ApplicationError;
use hatch_core::application::ports::TemplateCatalog;
use hatch_core::domain::{Deadline, ProjectKind, TemplateInfo};
use hatch_core::error::{HatchError, HatchResult};

use crate::http::HttpClient;

/// Where the catalog documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Remote(String),
    Local(PathBuf),
}

impl CatalogSource {
    pub fn parse(base: &str) -> Self {
        let base = base.trim();
        if base.starts_with("http://") || base.starts_with("https://") {
            Self::Remote(base.trim_end_matches('/').to_string())
        } else {
            Self::Local(PathBuf::from(base.strip_prefix("file://").unwrap_or(base)))
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTemplateCatalog {
    http: HttpClient,
    source: CatalogSource,
    project_path: String,
    component_path: String,
    deadline: Deadline,
}

impl HttpTemplateCatalog {
    pub fn new(
        base_url: &str,
        project_path: impl Into<String>,
        component_path: impl Into<String>,
    ) -> HatchResult<Self> {
        let http = HttpClient::new().map_err(|e| HatchError::Configuration {
            message: format!("cannot build HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            source: CatalogSource::parse(base_url),
            project_path: project_path.into(),
            component_path: component_path.into(),
            deadline: Deadline::none(),
        })
    }

    /// Bound catalog requests by `deadline`.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    fn path_for(&self, kind: ProjectKind) -> &str {
        match kind {
            ProjectKind::Project => &self.project_path,
            ProjectKind::Component => &self.component_path,
        }
    }
}

impl TemplateCatalog for HttpTemplateCatalog {
    #[instrument(skip(self))]
    fn fetch(&self, kind: ProjectKind) -> HatchResult<Vec<TemplateInfo>> {
        let path = self.path_for(kind).trim_start_matches('/');
        let templates: Vec<TemplateInfo> = match &self.source {
            CatalogSource::Remote(base) => {
                let url = format!("{base}/{path}");
                self.http
                    .get_json(&url, &self.deadline)
                    .map_err(|e| catalog_error(format!("{url}: {e}")))?
            }
            CatalogSource::Local(base) => {
                let file = base.join(path);
                let text = fs::read_to_string(&file)
                    .map_err(|e| catalog_error(format!("{}: {e}", file.display())))?;
                serde_json::from_str(&text)
                    .map_err(|e| catalog_error(format!("{}: {e}", file.display())))?
            }
        };
        debug!(count = templates.len(), "catalog fetched");
        Ok(templates)
    }
}

fn catalog_error(reason: String) -> HatchError {
    ApplicationError::Catalog { reason }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatch_core::domain::InstallKind;
    use tempfile::TempDir;

    const PROJECTS: &str = r#"[
        {"name": "Vue starter", "npmName": "@acme/vue-starter", "version": "1.2.0",
         "type": "normal", "tag": ["project"], "ignore": ["public/**"]},
        {"name": "Custom", "npmName": "acme/custom", "isGit": true, "type": "custom",
         "tag": ["project", "component"]}
    ]"#;

    fn catalog(dir: &TempDir) -> HttpTemplateCatalog {
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(dir.path().join("templates/project.json"), PROJECTS).unwrap();
        HttpTemplateCatalog::new(
            &dir.path().display().to_string(),
            "/templates/project.json",
            "templates/component.json",
        )
        .unwrap()
    }

    #[test]
    fn parses_sources() {
        assert_eq!(
            CatalogSource::parse("https://cdn.example.com/"),
            CatalogSource::Remote("https://cdn.example.com".into())
        );
        assert_eq!(
            CatalogSource::parse("file:///srv/catalog"),
            CatalogSource::Local(PathBuf::from("/srv/catalog"))
        );
    }

    #[test]
    fn reads_a_local_catalog() {
        let dir = TempDir::new().unwrap();
        let templates = catalog(&dir).fetch(ProjectKind::Project).unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].canonical_id, "@acme/vue-starter");
        assert_eq!(templates[0].ignore_patterns, vec!["public/**"]);
        assert_eq!(templates[1].install_kind, InstallKind::Custom);
        assert!(templates[1].is_remote_repo);
    }

    #[test]
    fn missing_document_is_a_catalog_error() {
        let dir = TempDir::new().unwrap();
        let err = catalog(&dir).fetch(ProjectKind::Component).unwrap_err();
        assert!(matches!(
            err,
            HatchError::Application(ApplicationError::Catalog { .. })
        ));
        assert!(err.to_string().contains("component.json"));
    }

    #[test]
    fn malformed_document_is_a_catalog_error() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);
        fs::write(dir.path().join("templates/component.json"), "{not json").unwrap();
        assert!(catalog.fetch(ProjectKind::Component).is_err());
    }
}
