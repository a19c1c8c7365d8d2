//! Source-control snapshot adapter.

pub mod git;
pub mod locator;

pub use git::GitSnapshotDownloader;
pub use locator::{DEFAULT_REF, Locator};
