//! Package manager
//!
//! Owns the working state for one request: the live configuration collection,
//! the package definitions, the installed modules and the declared bundles.
//! Built from a workspace snapshot and convertible back; everything in between
//! is explicit state threaded through the reconciler and the CLI commands.

use crate::collection::ConfigCollection;
use crate::errors::{PackageError, Result};
use crate::item::ConfigItem;
use crate::package::{validate_machine_name, Bundle, Package};
use crate::snapshot::{ConfigItemRecord, WorkspaceSnapshot};
use indexmap::IndexMap;
use tracing::debug;

/// Working state for one site workspace.
#[derive(Debug, Clone)]
pub struct PackageManager {
    collection: ConfigCollection,
    packages: IndexMap<String, Package>,
    modules: IndexMap<String, String>,
    bundles: IndexMap<String, Bundle>,
}

impl PackageManager {
    /// Build the manager from a snapshot, deriving item types from the
    /// registry prefixes.
    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let mut collection = ConfigCollection::new(snapshot.types);
        for record in snapshot.items {
            collection.insert(
                record.name,
                record.label,
                record.package,
                record.provider,
                record.dependencies,
            );
        }
        let packages = snapshot
            .packages
            .into_iter()
            .map(|p| (p.machine_name.clone(), p))
            .collect();
        let bundles = snapshot
            .bundles
            .into_iter()
            .map(|b| (b.machine_name.clone(), b))
            .collect();
        Ok(Self {
            collection,
            packages,
            modules: snapshot.modules,
            bundles,
        })
    }

    /// Convert back to a snapshot for persistence.
    pub fn to_snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            types: self.collection.types().cloned().collect(),
            modules: self.modules.clone(),
            bundles: self.bundles.values().cloned().collect(),
            items: self
                .collection
                .items()
                .map(|item| ConfigItemRecord {
                    name: item.name.clone(),
                    label: item.label.clone(),
                    package: item.package.clone(),
                    provider: item.provider.clone(),
                    dependencies: item.dependencies.clone(),
                })
                .collect(),
            packages: self.packages.values().cloned().collect(),
        }
    }

    pub fn collection(&self) -> &ConfigCollection {
        &self.collection
    }

    pub fn packages(&self) -> &IndexMap<String, Package> {
        &self.packages
    }

    pub fn modules(&self) -> &IndexMap<String, String> {
        &self.modules
    }

    pub fn package(&self, machine_name: &str) -> Option<&Package> {
        self.packages.get(machine_name)
    }

    /// Insert or replace a package definition.
    pub fn set_package(&mut self, package: Package) {
        self.packages.insert(package.machine_name.clone(), package);
    }

    /// Add a configuration item to the live collection (used by the importer).
    pub fn insert_item(&mut self, record: ConfigItemRecord) {
        self.collection.insert(
            record.name,
            record.label,
            record.package,
            record.provider,
            record.dependencies,
        );
    }

    pub fn bundle(&self, machine_name: &str) -> Option<&Bundle> {
        self.bundles.get(machine_name)
    }

    /// The declared default bundle, or the built-in prefix-less one.
    pub fn default_bundle(&self) -> Bundle {
        self.bundles
            .values()
            .find(|b| b.is_default)
            .cloned()
            .unwrap_or_else(Bundle::default_bundle)
    }

    pub fn module_exists(&self, machine_name: &str) -> bool {
        self.modules.contains_key(machine_name)
    }

    pub fn module_label<'a>(&'a self, machine_name: &'a str) -> &'a str {
        self.modules
            .get(machine_name)
            .map(String::as_str)
            .unwrap_or(machine_name)
    }

    /// A machine name conflicts when an exported package or an installed
    /// module already carries it. Unexported package definitions do not
    /// block reuse.
    pub fn name_taken(&self, machine_name: &str) -> bool {
        self.packages
            .get(machine_name)
            .map(|p| p.is_exported())
            .unwrap_or(false)
            || self.module_exists(machine_name)
    }

    /// Initialize a new package in the given bundle (default bundle when
    /// `None`). Dashes and spaces in the short name are normalized to
    /// underscores before validation, and the bundle prefix is applied.
    pub fn init_package(
        &mut self,
        short_name: &str,
        human_name: &str,
        bundle_name: Option<&str>,
    ) -> Result<&Package> {
        let bundle = match bundle_name {
            Some(name) => {
                self.bundles
                    .get(name)
                    .cloned()
                    .ok_or(PackageError::UnknownBundle {
                        name: name.to_string(),
                    })?
            }
            None => self.default_bundle(),
        };
        let normalized = short_name.replace(['-', ' '], "_");
        validate_machine_name(&normalized)?;
        let machine_name = bundle.full_name(&normalized);
        if self.name_taken(&machine_name) {
            return Err(PackageError::NameTaken { name: machine_name }.into());
        }
        let mut package = Package::new(machine_name.clone(), human_name);
        package.bundle = bundle.machine_name.clone();
        debug!(package = %machine_name, "initialized package");
        self.packages.insert(machine_name.clone(), package);
        Ok(&self.packages[&machine_name])
    }

    /// Configuration not claimed by any package, for the export preview.
    pub fn unpackaged(&self) -> Vec<&ConfigItem> {
        self.collection
            .items()
            .filter(|item| item.package.as_deref().map(str::is_empty).unwrap_or(true))
            .collect()
    }

    /// Order missing config for import so storage-bearing types come first;
    /// order is otherwise preserved. Keeps field storage importable before
    /// the fields that depend on it without modeling the entity system.
    pub fn reorder_missing(&self, missing: &[String]) -> Vec<String> {
        let mut ordered: Vec<(usize, String)> = missing
            .iter()
            .map(|name| {
                let (type_id, _) = self.collection.parse_name(name);
                let weight = if type_id.contains("storage") { 0 } else { 1 };
                (weight, name.clone())
            })
            .collect();
        ordered.sort_by_key(|(weight, _)| *weight);
        ordered.into_iter().map(|(_, name)| name).collect()
    }
}
