//! Workspace snapshot persistence
//!
//! The snapshot is a JSON document describing one site's live configuration:
//! the component type registry, the installed modules, the declared bundles,
//! every configuration item with its label/owner/dependency edges, and the
//! package definitions. It is the boundary to the external config storage:
//! reading and writing is a plain serde round-trip with no storage semantics.

use crate::errors::SnapshotError;
use crate::item::ConfigType;
use crate::package::{Bundle, Package};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Raw configuration item as stored in the snapshot. Type and short name are
/// derived on load from the type registry's prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItemRecord {
    /// Full config name
    pub name: String,
    /// Human label
    pub label: String,
    /// Machine name of the claiming package, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Providing module, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Full names of configuration this item depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// One site's configuration workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// Component type registry
    #[serde(default)]
    pub types: Vec<ConfigType>,
    /// Installed modules: machine name -> human label
    #[serde(default)]
    pub modules: IndexMap<String, String>,
    /// Declared bundles
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    /// Live configuration items
    #[serde(default)]
    pub items: Vec<ConfigItemRecord>,
    /// Package definitions
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl WorkspaceSnapshot {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            return Err(SnapshotError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let snapshot: WorkspaceSnapshot =
            serde_json::from_str(&content).map_err(|e| SnapshotError::Parsing {
                message: e.to_string(),
            })?;
        snapshot.validate()?;
        debug!(
            items = snapshot.items.len(),
            packages = snapshot.packages.len(),
            "loaded workspace snapshot"
        );
        Ok(snapshot)
    }

    /// Save the snapshot to a JSON file. The write goes through a temporary
    /// sibling file and a rename so a crash never leaves a torn snapshot.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, path)?;
        debug!(path = %path.display(), "saved workspace snapshot");
        Ok(())
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen_items = std::collections::HashSet::new();
        for item in &self.items {
            if !seen_items.insert(item.name.as_str()) {
                return Err(SnapshotError::Validation {
                    message: format!("duplicate config item: {}", item.name),
                });
            }
        }
        let mut seen_packages = std::collections::HashSet::new();
        for package in &self.packages {
            if !seen_packages.insert(package.machine_name.as_str()) {
                return Err(SnapshotError::Validation {
                    message: format!("duplicate package: {}", package.machine_name),
                });
            }
        }
        let defaults = self.bundles.iter().filter(|b| b.is_default).count();
        if defaults > 1 {
            return Err(SnapshotError::Validation {
                message: "more than one default bundle".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            types: vec![ConfigType::new("view", "Views", "views.view")],
            modules: IndexMap::from([("views".to_string(), "Views".to_string())]),
            bundles: vec![Bundle::default_bundle()],
            items: vec![ConfigItemRecord {
                name: "views.view.frontpage".to_string(),
                label: "Frontpage".to_string(),
                package: None,
                provider: Some("views".to_string()),
                dependencies: vec![],
            }],
            packages: vec![Package::new("gallery", "Gallery")],
        }
    }

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.json");
        let snapshot = sample();
        snapshot.save(&path).unwrap();
        let loaded = WorkspaceSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = WorkspaceSnapshot::load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.json");
        std::fs::write(&path, "not valid json {{{").unwrap();
        let err = WorkspaceSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::Parsing { .. }));
    }

    #[test]
    fn test_validate_duplicate_item() {
        let mut snapshot = sample();
        snapshot.items.push(snapshot.items[0].clone());
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, SnapshotError::Validation { .. }));
    }

    #[test]
    fn test_validate_duplicate_package() {
        let mut snapshot = sample();
        snapshot.packages.push(Package::new("gallery", "Gallery 2"));
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, SnapshotError::Validation { .. }));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let snapshot: WorkspaceSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.items.is_empty());
        assert!(snapshot.packages.is_empty());
    }
}
