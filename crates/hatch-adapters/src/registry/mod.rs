//! npm-compatible package registry adapter.

pub mod metadata;
pub mod npm;

pub use metadata::{PackageMetadata, VersionMetadata};
pub use npm::{NpmRegistry, encode_package_name};
