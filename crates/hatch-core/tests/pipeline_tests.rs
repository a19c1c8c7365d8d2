//! End-to-end tests for the acquisition, cache and install pipeline.
//!
//! Collaborators are small in-process fakes; child processes are real `sh`
//! invocations.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tempfile::TempDir;

use hatch_core::application::{
    ArtifactCache, CoreSettings, InstallRequest, InstallStrategySelector, PluginDispatcher,
    PluginTable, ProjectRequest, RenderingPass, RuntimeConfig, ScaffoldService, StagingDownloader,
    SubprocessInvoker,
    ports::{
        DependencyInstaller, PackageRegistry, SnapshotDownloader, TemplateCatalog, TemplateEngine,
    },
};
use hatch_core::domain::{CommandContext, Deadline, PackageSpec, ProjectKind, TemplateInfo, cache_path};
use hatch_core::error::{HatchError, HatchResult};

// -----------------------------------------------------------------------------
// Fakes
// -----------------------------------------------------------------------------

/// Registry that always answers `latest` and materializes a runnable package.
struct FakeRegistry {
    latest: &'static str,
    installs: AtomicUsize,
}

impl FakeRegistry {
    fn new(latest: &'static str) -> Self {
        Self {
            latest,
            installs: AtomicUsize::new(0),
        }
    }

    fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl PackageRegistry for FakeRegistry {
    fn resolve_latest(&self, _name: &str, _deadline: &Deadline) -> HatchResult<String> {
        Ok(self.latest.to_string())
    }

    fn install(&self, request: &InstallRequest, _deadline: &Deadline) -> HatchResult<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        for pkg in &request.packages {
            let entry = cache_path(&request.store_dir, &pkg.name, &pkg.version);
            fs::create_dir_all(entry.join("lib")).unwrap();
            fs::write(entry.join("package.json"), r#"{"main": "lib/index.js"}"#).unwrap();
            fs::write(entry.join("lib/index.js"), "").unwrap();
        }
        Ok(())
    }
}

struct FakeSnapshots;

impl SnapshotDownloader for FakeSnapshots {
    fn download(&self, _locator: &str, destination: &Path, _deadline: &Deadline) -> HatchResult<()> {
        fs::write(destination.join("README.md"), "# {{name}}\n").unwrap();
        Ok(())
    }
}

/// Replaces `{{key}}` with top-level string values of the context.
struct BraceEngine;

impl TemplateEngine for BraceEngine {
    fn render(&self, source: &str, context: &Value) -> HatchResult<String> {
        let mut out = source.to_string();
        if let Some(map) = context.as_object() {
            for (key, value) in map {
                if let Some(text) = value.as_str() {
                    out = out.replace(&format!("{{{{{key}}}}}"), text);
                }
            }
        }
        Ok(out)
    }
}

struct FakeCatalog;

impl TemplateCatalog for FakeCatalog {
    fn fetch(&self, _kind: ProjectKind) -> HatchResult<Vec<TemplateInfo>> {
        let list = serde_json::json!([
            {"name": "Readme", "npmName": "acme/readme", "isGit": true, "tag": ["component"]}
        ]);
        Ok(serde_json::from_value(list).unwrap())
    }
}

struct NoDependencies;

impl DependencyInstaller for NoDependencies {
    fn install(&self, _dir: &Path, _deadline: &Deadline) -> HatchResult<()> {
        Ok(())
    }
}

fn sh(script: &str) -> RuntimeConfig {
    RuntimeConfig {
        program: "sh".into(),
        args: vec!["-c".into(), script.into(), "hatch-child".into()],
    }
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

#[test]
fn plugin_dispatch_installs_latest_and_forwards_exit_code() {
    let home = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    let args_seen = cwd.path().join("args.json");

    let settings = CoreSettings::new(home.path());
    let registry = Arc::new(FakeRegistry::new("2.3.0"));
    let cache = Arc::new(ArtifactCache::new(registry.clone(), &settings));
    let script = format!(r#"cp "$HATCH_PAYLOAD" "{}"; exit 3"#, args_seen.display());
    let dispatcher = PluginDispatcher::new(
        PluginTable::new(&[("get-plugin-x", "plugin-x")]),
        cache,
        SubprocessInvoker::new(sh(&script)),
        &settings,
    )
    .with_cwd(cwd.path());

    let context = CommandContext::new(vec!["demo".into()]).with_option("_session", "s1");
    let code = dispatcher
        .run("get-plugin-x", &context, &Deadline::none())
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(registry.installs(), 1);

    let entry = home
        .path()
        .join("dependencies/node_modules/_plugin-x@2.3.0@plugin-x");
    assert!(entry.join("lib/index.js").is_file());

    let envelope: Value = serde_json::from_str(&fs::read_to_string(args_seen).unwrap()).unwrap();
    assert_eq!(envelope["kind"], "command");
    assert_eq!(
        envelope["entryPoint"],
        entry.join("lib/index.js").display().to_string()
    );
    assert_eq!(envelope["payload"][0], "demo");
    assert!(envelope["payload"][1].get("_session").is_none());
}

#[test]
fn second_dispatch_hits_the_cache() {
    let home = TempDir::new().unwrap();
    let settings = CoreSettings::new(home.path());
    let registry = Arc::new(FakeRegistry::new("2.3.0"));
    let cache = Arc::new(ArtifactCache::new(registry.clone(), &settings));
    let dispatcher = PluginDispatcher::new(
        PluginTable::new(&[("get-plugin-x", "plugin-x")]),
        cache,
        SubprocessInvoker::new(sh("exit 0")),
        &settings,
    )
    .with_cwd(home.path());

    for _ in 0..2 {
        let code = dispatcher
            .run("get-plugin-x", &CommandContext::default(), &Deadline::none())
            .unwrap();
        assert_eq!(code, 0);
    }
    assert_eq!(registry.installs(), 1);
}

#[test]
fn resolve_then_exists_after_install() {
    let home = TempDir::new().unwrap();
    let settings = CoreSettings::new(home.path());
    let cache = ArtifactCache::new(Arc::new(FakeRegistry::new("1.4.2")), &settings);
    let (target, store) = settings.plugin_cache();

    let mut spec = PackageSpec::new("@acme/plugin", "latest", target)
        .unwrap()
        .with_store_dir(store);
    cache.install(&mut spec, &Deadline::none()).unwrap();

    assert!(semver::Version::parse(spec.version()).is_ok());
    assert!(cache.exists(&mut spec, &Deadline::none()).unwrap());
}

#[test]
fn component_lands_next_to_existing_repository_files() {
    let home = TempDir::new().unwrap();
    let cwd = TempDir::new().unwrap();
    fs::create_dir_all(cwd.path().join(".git")).unwrap();

    let settings = CoreSettings::new(home.path());
    let cache = Arc::new(ArtifactCache::new(
        Arc::new(FakeRegistry::new("1.0.0")),
        &settings,
    ));
    let service = ScaffoldService::new(
        Arc::new(FakeCatalog),
        StagingDownloader::new(Arc::new(FakeSnapshots), cache, &settings),
        InstallStrategySelector::new(
            RenderingPass::new(Arc::new(BraceEngine)),
            Arc::new(NoDependencies),
            SubprocessInvoker::new(sh("exit 0")),
        ),
    );

    let request = ProjectRequest {
        kind: ProjectKind::Component,
        name: "Widget".into(),
        version: "1.0.0".into(),
        template: "acme/readme".into(),
        description: None,
        force: false,
        cwd: cwd.path().to_path_buf(),
    };
    service.init(&request, &Deadline::none()).unwrap();

    assert_eq!(
        fs::read_to_string(cwd.path().join("README.md")).unwrap(),
        "# Widget\n"
    );
    let mut names: Vec<_> = fs::read_dir(cwd.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec![".git", "README.md"]);

    // Same component again: README.md now collides.
    let err = service.init(&request, &Deadline::none()).unwrap_err();
    assert!(matches!(err, HatchError::Application(_)));
    assert!(err.to_string().contains("README.md"));
}
