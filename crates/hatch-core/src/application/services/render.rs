//! In-place rendering of an installed template tree.
//!
//! Every file not excluded by the ignore patterns is read, rendered through
//! the [`TemplateEngine`] with the project metadata, and overwritten. Files
//! render concurrently; the pass fails if any file fails.
//!
//! The pass is not atomic. Every file is attempted, and files that rendered
//! successfully keep their new content even when another file fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::application::ApplicationError;
use crate::application::ports::TemplateEngine;
use crate::error::{HatchError, HatchResult};

/// Always excluded: installed dependency trees.
pub const BUILTIN_IGNORE: &str = "**/node_modules/**";

const DEPENDENCY_DIR: &str = "node_modules";

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Counts from a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    /// Matched an ignore pattern.
    pub ignored: usize,
    /// Not valid UTF-8; left as is.
    pub binary: usize,
}

enum FileResult {
    Rendered,
    Binary,
}

/// Rewrites files in place through a template engine.
#[derive(Clone)]
pub struct RenderingPass {
    engine: Arc<dyn TemplateEngine>,
}

impl RenderingPass {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Render every file under `root`.
    #[instrument(skip(self, ignore, context), fields(root = %root.display()))]
    pub fn run(&self, root: &Path, ignore: &[String], context: &Value) -> HatchResult<RenderReport> {
        let files = list_files(root)?;
        self.render_files(root, &files, ignore, context)
    }

    /// Render the given files, relative to `root`.
    pub fn render_files(
        &self,
        root: &Path,
        files: &[PathBuf],
        ignore: &[String],
        context: &Value,
    ) -> HatchResult<RenderReport> {
        let patterns = compile(root, ignore)?;
        let (selected, ignored): (Vec<&PathBuf>, Vec<&PathBuf>) = files
            .iter()
            .partition(|rel| !is_ignored(&patterns, rel));
        debug!(selected = selected.len(), ignored = ignored.len(), "rendering");

        let results: Vec<HatchResult<FileResult>> = selected
            .par_iter()
            .map(|rel| self.render_one(&root.join(rel), context))
            .collect();

        let mut report = RenderReport {
            ignored: ignored.len(),
            ..RenderReport::default()
        };
        let mut first_error = None;
        for result in results {
            match result {
                Ok(FileResult::Rendered) => report.rendered += 1,
                Ok(FileResult::Binary) => report.binary += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            warn!(
                rendered = report.rendered,
                "rendering failed; files already rewritten keep their new content"
            );
            return Err(e);
        }
        Ok(report)
    }

    fn render_one(&self, path: &Path, context: &Value) -> HatchResult<FileResult> {
        let bytes = fs::read(path).map_err(|e| ApplicationError::filesystem(path, e))?;
        let Ok(source) = String::from_utf8(bytes) else {
            return Ok(FileResult::Binary);
        };

        let rendered = self
            .engine
            .render(&source, context)
            .map_err(|e| ApplicationError::Rendering {
                path: path.to_path_buf(),
                reason: match e {
                    HatchError::Application(ApplicationError::Rendering { reason, .. }) => reason,
                    other => other.to_string(),
                },
            })?;
        fs::write(path, rendered).map_err(|e| ApplicationError::filesystem(path, e))?;
        Ok(FileResult::Rendered)
    }
}

/// Relative paths of every file under `root`, skipping dependency trees.
pub(crate) fn list_files(root: &Path) -> HatchResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != DEPENDENCY_DIR);
    for entry in walker {
        let entry = entry.map_err(|e| ApplicationError::filesystem(root, e))?;
        if entry.file_type().is_file() {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_path_buf());
            }
        }
    }
    Ok(files)
}

fn compile(root: &Path, ignore: &[String]) -> HatchResult<Vec<Pattern>> {
    std::iter::once(BUILTIN_IGNORE)
        .chain(ignore.iter().map(String::as_str))
        .map(|raw| {
            Pattern::new(raw).map_err(|e| {
                HatchError::from(ApplicationError::Manifest {
                    path: root.to_path_buf(),
                    reason: format!("invalid ignore pattern '{raw}': {e}"),
                })
            })
        })
        .collect()
}

fn is_ignored(patterns: &[Pattern], rel: &Path) -> bool {
    let unix = rel.to_string_lossy().replace('\\', "/");
    rel.components().any(|c| c.as_os_str() == DEPENDENCY_DIR)
        || patterns.iter().any(|p| p.matches_with(&unix, MATCH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTemplateEngine;
    use serde_json::json;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    /// Upper-cases the source; fails on anything containing "BROKEN".
    fn upper_engine() -> MockTemplateEngine {
        let mut engine = MockTemplateEngine::new();
        engine.expect_render().returning(|source, _| {
            if source.contains("BROKEN") {
                Err(HatchError::Internal {
                    message: "unterminated tag".into(),
                })
            } else {
                Ok(source.to_uppercase())
            }
        });
        engine
    }

    #[test]
    fn renders_every_file() {
        let dir = tree(&[("a.txt", "one"), ("src/b.txt", "two"), ("src/c/d.txt", "three")]);
        let pass = RenderingPass::new(Arc::new(upper_engine()));

        let report = pass.run(dir.path(), &[], &json!({})).unwrap();

        assert_eq!(report.rendered, 3);
        assert_eq!(read(&dir, "a.txt"), "ONE");
        assert_eq!(read(&dir, "src/b.txt"), "TWO");
        assert_eq!(read(&dir, "src/c/d.txt"), "THREE");
    }

    #[test]
    fn honours_ignore_patterns_and_dependency_trees() {
        let dir = tree(&[
            ("index.html", "page"),
            ("public/logo.txt", "logo"),
            ("node_modules/dep/index.js", "dep"),
            ("pkg/node_modules/x.js", "x"),
        ]);
        let pass = RenderingPass::new(Arc::new(upper_engine()));

        let report = pass
            .run(dir.path(), &["public/**".to_string()], &json!({}))
            .unwrap();

        assert_eq!(report.rendered, 1);
        assert_eq!(report.ignored, 1);
        assert_eq!(read(&dir, "index.html"), "PAGE");
        assert_eq!(read(&dir, "public/logo.txt"), "logo");
        assert_eq!(read(&dir, "node_modules/dep/index.js"), "dep");
        assert_eq!(read(&dir, "pkg/node_modules/x.js"), "x");
    }

    #[test]
    fn failure_keeps_files_already_rewritten() {
        let dir = tree(&[("a.txt", "fine"), ("b.txt", "BROKEN"), ("c.txt", "also fine")]);
        let pass = RenderingPass::new(Arc::new(upper_engine()));

        let err = pass.run(dir.path(), &[], &json!({})).unwrap_err();

        assert!(err.to_string().contains("b.txt"));
        assert_eq!(read(&dir, "b.txt"), "BROKEN");
        assert_eq!(read(&dir, "a.txt"), "FINE");
        assert_eq!(read(&dir, "c.txt"), "ALSO FINE");
    }

    #[test]
    fn binary_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0xff, 0xfe]).unwrap();
        let pass = RenderingPass::new(Arc::new(upper_engine()));

        let report = pass.run(dir.path(), &[], &json!({})).unwrap();

        assert_eq!(report.binary, 1);
        assert_eq!(fs::read(dir.path().join("logo.png")).unwrap(), [0x89, 0x50, 0xff, 0xfe]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let dir = tree(&[("a.txt", "x")]);
        let pass = RenderingPass::new(Arc::new(upper_engine()));
        let err = pass
            .run(dir.path(), &["[".to_string()], &json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("invalid ignore pattern"));
    }
}
