//! Helpers shared across commands

use anyhow::{Context, Result};
use confpack_core::manager::PackageManager;
use confpack_core::package::PackageStatus;
use confpack_core::reconcile::SubmittedValues;
use confpack_core::snapshot::WorkspaceSnapshot;
use std::path::Path;

/// Load the workspace snapshot into a manager.
pub fn load_manager(snapshot: &Path) -> Result<PackageManager> {
    let snapshot = WorkspaceSnapshot::load(snapshot)
        .with_context(|| format!("Failed to load workspace snapshot {}", snapshot.display()))?;
    PackageManager::from_snapshot(snapshot).context("Invalid workspace snapshot")
}

/// Persist the manager's state back to the snapshot file.
pub fn save_manager(manager: &PackageManager, snapshot: &Path) -> Result<()> {
    manager
        .to_snapshot()
        .save(snapshot)
        .with_context(|| format!("Failed to save workspace snapshot {}", snapshot.display()))
}

/// Load a selections file, or produce the first-render input when absent.
/// Item keys in the file are form-encoded and decode here.
pub fn load_selections(path: Option<&Path>) -> Result<SubmittedValues> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read selections from {}", path.display()))?;
            let values: SubmittedValues = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse selections from {}", path.display()))?;
            Ok(values.decoded())
        }
        None => Ok(SubmittedValues::first_render()),
    }
}

pub fn status_str(status: PackageStatus) -> &'static str {
    match status {
        PackageStatus::NoExport => "not exported",
        PackageStatus::Uninstalled => "uninstalled",
        PackageStatus::Installed => "installed",
    }
}
