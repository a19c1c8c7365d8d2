//! Builds the core services from configuration and the concrete adapters.

use std::path::Path;
use std::sync::Arc;

use hatch_adapters::{
    CommandDependencyInstaller, GitSnapshotDownloader, HttpTemplateCatalog, NpmRegistry,
    PlaceholderEngine,
};
use hatch_core::application::{
    ArtifactCache, CoreSettings, DEFAULT_PLUGINS, InstallStrategySelector, PluginDispatcher,
    RenderingPass, ScaffoldService, StagingDownloader, SubprocessInvoker,
};
use hatch_core::domain::Deadline;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::CliResult;

/// The registry-backed package cache.
pub fn artifact_cache(settings: &CoreSettings) -> CliResult<Arc<ArtifactCache>> {
    let registry = NpmRegistry::new(settings.registry_url.clone())?;
    Ok(Arc::new(ArtifactCache::new(Arc::new(registry), settings)))
}

/// Catalog, downloader, and installer wired for `init`, `add`, and `list`.
pub fn scaffold_service(
    config: &AppConfig,
    settings: &CoreSettings,
    deadline: &Deadline,
) -> CliResult<ScaffoldService> {
    debug!(base_url = %config.base_url, "building scaffold service");
    let catalog = HttpTemplateCatalog::new(
        &config.base_url,
        config.project_template.clone(),
        config.component_template.clone(),
    )?
    .with_deadline(*deadline);

    let downloader = StagingDownloader::new(
        Arc::new(GitSnapshotDownloader::new()?),
        artifact_cache(settings)?,
        settings,
    );
    let installer = InstallStrategySelector::new(
        RenderingPass::new(Arc::new(PlaceholderEngine::new())),
        Arc::new(CommandDependencyInstaller::new(
            config.installer.program.clone(),
            config.installer.args.clone(),
        )),
        SubprocessInvoker::new(settings.runtime.clone()),
    );

    Ok(ScaffoldService::new(Arc::new(catalog), downloader, installer))
}

/// Dispatcher for the built-in plugin commands, running in `cwd`.
pub fn plugin_dispatcher(settings: &CoreSettings, cwd: &Path) -> CliResult<PluginDispatcher> {
    Ok(PluginDispatcher::new(
        DEFAULT_PLUGINS,
        artifact_cache(settings)?,
        SubprocessInvoker::new(settings.runtime.clone()),
        settings,
    )
    .with_cwd(cwd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::GlobalArgs;
    use tempfile::TempDir;

    #[test]
    fn dispatcher_uses_the_default_plugin_table() {
        let home = TempDir::new().unwrap();
        let settings = CoreSettings::new(home.path());
        let dispatcher = plugin_dispatcher(&settings, home.path()).unwrap();
        assert_eq!(dispatcher.table(), &DEFAULT_PLUGINS);
    }

    #[test]
    fn scaffold_service_lists_a_local_catalog() {
        let catalog = TempDir::new().unwrap();
        std::fs::write(
            catalog.path().join("project.json"),
            r#"[{"name": "Starter", "npmName": "@acme/starter", "tag": ["project"]},
                {"name": "Button", "npmName": "@acme/button", "tag": ["component"]}]"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.base_url = catalog.path().display().to_string();
        let settings = config.core_settings(&GlobalArgs::default());
        let service = scaffold_service(&config, &settings, &Deadline::none()).unwrap();

        let templates = service
            .list_templates(hatch_core::domain::ProjectKind::Project)
            .unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Starter");
    }
}
