//! Core library for the confpack CLI
//!
//! This crate contains the data model for configuration packages, the selection
//! reconciler that merges exported, auto-detected and user-selected configuration
//! into one consistent partition, package generation, logging, and error handling.

pub mod collection;
pub mod encode;
pub mod errors;
pub mod generate;
pub mod import;
pub mod item;
pub mod logging;
pub mod manager;
pub mod package;
pub mod reconcile;
pub mod snapshot;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
