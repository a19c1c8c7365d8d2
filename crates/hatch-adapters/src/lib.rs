//! Infrastructure adapters for Hatch.
//!
//! This crate implements the ports defined in `hatch-core::application::ports`.
//! It contains all network access, archive handling and process spawning
//! that the core only sees through traits.

pub mod archive;
pub mod catalog;
pub mod http;
pub mod installer;
pub mod process;
pub mod registry;
pub mod renderer;
pub mod snapshot;

// Re-export commonly used adapters
pub use catalog::HttpTemplateCatalog;
pub use installer::CommandDependencyInstaller;
pub use registry::NpmRegistry;
pub use renderer::PlaceholderEngine;
pub use snapshot::GitSnapshotDownloader;
