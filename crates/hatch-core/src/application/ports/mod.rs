//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `hatch-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `PackageRegistry`: version lookup and package installs
//!   - `SnapshotDownloader`: source-control snapshots
//!   - `TemplateEngine`: text rendering
//!   - `TemplateCatalog`: the remote template list
//!   - `DependencyInstaller`: a staged package's own dependencies
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{
    DependencyInstaller, InstallRequest, PackageRegistry, SnapshotDownloader, TemplateCatalog,
    TemplateEngine,
};

#[cfg(test)]
pub use output::{
    MockDependencyInstaller, MockPackageRegistry, MockSnapshotDownloader, MockTemplateCatalog,
    MockTemplateEngine,
};
