//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod export;
pub mod import_missing;
pub mod init;
pub mod list;
pub mod reconcile;
pub mod shared;
