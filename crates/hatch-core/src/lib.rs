//! Hatch Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Hatch
//! scaffolding tool: the artifact acquisition, version cache, and isolated
//! installation pipeline.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            hatch-cli (CLI)              │
//! │     (Builds CoreSettings, dispatches)   │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (ScaffoldService, PluginDispatcher,     │
//! │  ArtifactCache, StagingDownloader, ...) │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Registry, Snapshot, Engine, Catalog)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     hatch-adapters (Infrastructure)     │
//! │ (NpmRegistry, GitSnapshot, Placeholder) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hatch_core::prelude::*;
//!
//! let dispatcher = PluginDispatcher::new(table, cache, invoker, &settings);
//! let code = dispatcher.run("lint", &context, &Deadline::none())?;
//! std::process::exit(code);
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ArtifactCache, ComponentRequest, CoreSettings, EntryPointLocator, InstallStrategySelector,
        PluginDispatcher, PluginTable, ProjectRequest, RenderingPass, RuntimeConfig,
        ScaffoldService, StagingDownloader, SubprocessInvoker, VersionResolver,
        ports::{
            DependencyInstaller, PackageRegistry, SnapshotDownloader, TemplateCatalog,
            TemplateEngine,
        },
    };
    pub use crate::domain::{
        CommandContext, Deadline, InstallKind, PackageRef, PackageSpec, ProjectInfo, ProjectKind,
        TemplateInfo,
    };
    pub use crate::error::{HatchError, HatchResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
