//! Template rendering adapters.

pub mod placeholder;

pub use placeholder::{PlaceholderEngine, PlaceholderError};
