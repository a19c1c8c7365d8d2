//! Template catalog adapters.

pub mod http;

pub use http::{CatalogSource, HttpTemplateCatalog};
