//! Plugin subcommand dispatch.
//!
//! A pluggable subcommand is one entry in a [`PluginTable`]: the command name
//! and the package that implements it. Running the command makes sure the
//! package is in the dependency cache, finds its entry point, and runs it in a
//! child process with the command's arguments. The child's exit code becomes
//! the command's exit code.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::subprocess::absolute;
use super::{ArtifactCache, EntryPointLocator, InvocationKind, SubprocessInvoker};
use crate::application::{ApplicationError, CoreSettings};
use crate::domain::{CommandContext, Deadline, LATEST, PackageSpec};
use crate::error::HatchResult;

/// Static mapping from command name to plugin package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginTable {
    entries: &'static [(&'static str, &'static str)],
}

/// Plugins shipped with the tool.
pub const DEFAULT_PLUGINS: PluginTable = PluginTable::new(&[
    ("lint", "@hatch-cli/lint"),
    ("publish", "@hatch-cli/publish"),
    ("deploy", "@hatch-cli/deploy"),
]);

impl PluginTable {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn package_for(&self, command: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == command)
            .map(|(_, package)| *package)
    }

    pub fn commands(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

/// Runs plugin subcommands.
pub struct PluginDispatcher {
    table: PluginTable,
    cache: Arc<ArtifactCache>,
    locator: EntryPointLocator,
    invoker: SubprocessInvoker,
    cache_root: (PathBuf, PathBuf),
    local_override: Option<PathBuf>,
    cwd: PathBuf,
}

impl PluginDispatcher {
    pub fn new(
        table: PluginTable,
        cache: Arc<ArtifactCache>,
        invoker: SubprocessInvoker,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            table,
            cache,
            locator: EntryPointLocator::new(),
            invoker,
            cache_root: settings.plugin_cache(),
            local_override: settings.local_override.clone(),
            cwd: PathBuf::from("."),
        }
    }

    /// Directory the plugin process runs in.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn table(&self) -> &PluginTable {
        &self.table
    }

    /// Run `command` and return the exit code to exit with.
    ///
    /// A package without an entry point has nothing to run and exits 0.
    #[instrument(skip(self, context, deadline))]
    pub fn run(
        &self,
        command: &str,
        context: &CommandContext,
        deadline: &Deadline,
    ) -> HatchResult<i32> {
        let package = self.table.package_for(command).ok_or_else(|| {
            ApplicationError::UnknownCommand {
                name: command.to_string(),
                available: self.table.commands().map(String::from).collect(),
            }
        })?;

        let spec = self.provision(package, deadline)?;
        let root = spec.package_root()?;

        let Some(entry_point) = self.locator.locate(&root) else {
            warn!(package = %spec, root = %root.display(), "plugin has no entry point; nothing to run");
            return Ok(0);
        };

        info!(package = %spec, entry = %entry_point.display(), "running plugin");
        let outcome = self.invoker.invoke(
            &entry_point,
            InvocationKind::Command,
            &context.to_payload(),
            &absolute(&self.cwd),
            deadline,
        )?;

        match outcome.code() {
            Some(code) => Ok(code),
            None => outcome.into_result(&entry_point).map(|()| 0),
        }
    }

    /// Make the plugin package available locally.
    ///
    /// With a local override the package is used in place: no cache, no
    /// install, no version lookup.
    fn provision(&self, package: &str, deadline: &Deadline) -> HatchResult<PackageSpec> {
        if let Some(path) = &self.local_override {
            info!(path = %path.display(), "using local plugin override");
            return Ok(PackageSpec::new(package, LATEST, path)?);
        }

        let (target, store) = &self.cache_root;
        let mut spec = PackageSpec::new(package, LATEST, target)?.with_store_dir(store);
        if self.cache.exists(&mut spec, deadline)? {
            self.cache.update(&mut spec, deadline)?;
        } else {
            self.cache.install(&mut spec, deadline)?;
        }
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::RuntimeConfig;
    use crate::application::ports::MockPackageRegistry;
    use crate::error::HatchError;
    use std::fs;
    use tempfile::TempDir;

    const TABLE: PluginTable = PluginTable::new(&[("get-plugin-x", "plugin-x")]);

    fn sh(script: &str) -> SubprocessInvoker {
        SubprocessInvoker::new(RuntimeConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "hatch-child".into()],
        })
    }

    fn write_package(root: &std::path::Path) {
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("package.json"), r#"{"main": "lib/index.js"}"#).unwrap();
        fs::write(root.join("lib/index.js"), "").unwrap();
    }

    #[test]
    fn table_lookup() {
        assert_eq!(DEFAULT_PLUGINS.package_for("lint"), Some("@hatch-cli/lint"));
        assert_eq!(DEFAULT_PLUGINS.package_for("init"), None);
        assert!(DEFAULT_PLUGINS.commands().any(|c| c == "publish"));
    }

    #[test]
    fn unknown_command_lists_the_available_ones() {
        let home = TempDir::new().unwrap();
        let settings = CoreSettings::new(home.path());
        let cache = Arc::new(ArtifactCache::new(
            Arc::new(MockPackageRegistry::new()),
            &settings,
        ));
        let err = PluginDispatcher::new(TABLE, cache, sh("exit 0"), &settings)
            .run("nope", &CommandContext::default(), &Deadline::none())
            .unwrap_err();

        match err {
            HatchError::Application(ApplicationError::UnknownCommand { available, .. }) => {
                assert_eq!(available, vec!["get-plugin-x"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn local_override_skips_the_cache() {
        let home = TempDir::new().unwrap();
        let plugin = TempDir::new().unwrap();
        write_package(plugin.path());

        let mut settings = CoreSettings::new(home.path());
        settings.local_override = Some(plugin.path().to_path_buf());
        let mut registry = MockPackageRegistry::new();
        registry.expect_resolve_latest().times(0);
        registry.expect_install().times(0);
        let cache = Arc::new(ArtifactCache::new(Arc::new(registry), &settings));

        let code = PluginDispatcher::new(TABLE, cache, sh("exit 7"), &settings)
            .run("get-plugin-x", &CommandContext::default(), &Deadline::none())
            .unwrap();
        assert_eq!(code, 7);
        assert!(!home.path().join("dependencies").exists());
    }

    #[test]
    fn missing_entry_point_runs_nothing() {
        let home = TempDir::new().unwrap();
        let plugin = TempDir::new().unwrap();
        fs::write(plugin.path().join("package.json"), r#"{"name": "plugin-x"}"#).unwrap();

        let mut settings = CoreSettings::new(home.path());
        settings.local_override = Some(plugin.path().to_path_buf());
        let cache = Arc::new(ArtifactCache::new(
            Arc::new(MockPackageRegistry::new()),
            &settings,
        ));

        let code = PluginDispatcher::new(TABLE, cache, sh("exit 9"), &settings)
            .run("get-plugin-x", &CommandContext::default(), &Deadline::none())
            .unwrap();
        assert_eq!(code, 0);
    }
}
