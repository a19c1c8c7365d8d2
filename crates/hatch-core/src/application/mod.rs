//! Application layer for Hatch.
//!
//! This layer contains:
//! - **Services**: the acquisition, cache, install, and dispatch pipeline
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Settings**: the explicit configuration every service is built from
//! - **Errors**: Application-specific error types

pub mod error;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export main services
pub use services::{
    ArtifactCache, ComponentRequest, DEFAULT_COMPONENT_DIR, DEFAULT_PLUGINS, EntryPointLocator, ExitOutcome,
    InstallJob, InstallOutcome, InstallReport, InstallStrategy, InstallStrategySelector,
    InvocationKind, PluginDispatcher, PluginTable, ProjectRequest, RenderReport, RenderingPass,
    ScaffoldService, StagedArtifact, StagingDir, StagingDownloader, SubprocessInvoker,
    VersionResolver, wait_for,
};

// Re-export port traits (for adapter implementation)
pub use ports::{
    DependencyInstaller, InstallRequest, PackageRegistry, SnapshotDownloader, TemplateCatalog,
    TemplateEngine,
};

pub use error::ApplicationError;
pub use settings::{
    CoreSettings, DEFAULT_REGISTRY, DEPENDENCIES_DIR, NODE_BOOTSTRAP, RuntimeConfig, STORE_DIR,
    TEMPLATE_DIR,
};
