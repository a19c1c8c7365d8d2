//! Core domain layer for Hatch.
//!
//! Plain data with behavior: package identities and their cache addresses,
//! template and project descriptions, the command context forwarded to
//! plugins, and the deadline threaded through every I/O step.
//!
//! Nothing in here touches the network or spawns processes.

pub mod command;
pub mod deadline;
pub mod error;
pub mod package;
pub mod project;
pub mod template;

pub use command::CommandContext;
pub use deadline::Deadline;
pub use error::{DomainError, ErrorCategory};
pub use package::{LATEST, PackageRef, PackageSpec, cache_path, escape_package_name};
pub use project::{ProjectInfo, ProjectKind, class_name, validate_project_name};
pub use template::{InstallKind, TemplateInfo};
