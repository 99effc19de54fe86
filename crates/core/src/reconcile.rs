//! Selection reconciliation
//!
//! Reconciles three overlapping views of a package's configuration (what it
//! already exported, what dependency detection pulls in, and what the user
//! just selected) into one consistent partition. Every eligible item lands
//! in exactly one of four sections per component type:
//!
//! - `sources`: available, not part of the package
//! - `included`: previously exported and still selected
//! - `detected`: pulled in by dependency detection
//! - `added`: newly selected (or deselected leftovers awaiting removal)
//!
//! The reconciler is a pure function of (package, collection, submission,
//! options): re-running it with identical inputs yields an identical
//! partition, and nothing is persisted here. Only the derived exclude/require
//! maps and the final config list are written back to the package, by the
//! caller, through [`ReconcileOutcome::apply`].

use crate::collection::ConfigCollection;
use crate::encode;
use crate::item::DEPENDENCIES_COMPONENT;
use crate::manager::PackageManager;
use crate::package::Package;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// The four partition sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Sources,
    Included,
    Detected,
    Added,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Sources,
        Section::Included,
        Section::Detected,
        Section::Added,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Sources => "sources",
            Section::Included => "included",
            Section::Detected => "detected",
            Section::Added => "added",
        }
    }
}

/// Selector for the two constraint maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Excluded,
    Required,
}

/// The exclude/require maps, keyed by (component type, item key).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionConstraints {
    pub excluded: BTreeMap<String, BTreeSet<String>>,
    pub required: BTreeMap<String, BTreeSet<String>>,
}

impl SelectionConstraints {
    fn map(&self, constraint: Constraint) -> &BTreeMap<String, BTreeSet<String>> {
        match constraint {
            Constraint::Excluded => &self.excluded,
            Constraint::Required => &self.required,
        }
    }

    fn map_mut(&mut self, constraint: Constraint) -> &mut BTreeMap<String, BTreeSet<String>> {
        match constraint {
            Constraint::Excluded => &mut self.excluded,
            Constraint::Required => &mut self.required,
        }
    }

    pub fn contains(&self, constraint: Constraint, component: &str, key: &str) -> bool {
        self.map(constraint)
            .get(component)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, constraint: Constraint, component: &str, key: &str) {
        self.map_mut(constraint)
            .entry(component.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Remove an entry; returns whether it was present.
    pub fn remove(&mut self, constraint: Constraint, component: &str, key: &str) -> bool {
        let map = self.map_mut(constraint);
        let removed = map
            .get_mut(component)
            .map(|keys| keys.remove(key))
            .unwrap_or(false);
        if let Some(keys) = map.get(component) {
            if keys.is_empty() {
                map.remove(component);
            }
        }
        removed
    }

    /// Flatten one constraint map to full config names for persistence.
    /// Module dependencies are dropped from the export list directly and are
    /// not recorded as config constraints.
    pub fn full_names(&self, constraint: Constraint, collection: &ConfigCollection) -> Vec<String> {
        let mut names = Vec::new();
        for (component, keys) in self.map(constraint) {
            if component.as_str() == DEPENDENCIES_COMPONENT {
                continue;
            }
            for key in keys {
                names.push(collection.full_name(component, key));
            }
        }
        names
    }
}

/// Classification of one item: its section, check state and display label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemState {
    pub section: Section,
    pub checked: bool,
    pub label: String,
}

/// Partition of one component type's items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentState {
    pub items: IndexMap<String, ItemState>,
}

impl ComponentState {
    /// Keys classified into the given section, in item order.
    pub fn section_keys(&self, section: Section) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(_, state)| state.section == section)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn count_in(&self, section: Section) -> usize {
        self.items
            .values()
            .filter(|state| state.section == section)
            .count()
    }
}

/// The full four-way partition across component types.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    pub components: IndexMap<String, ComponentState>,
}

impl SelectionState {
    fn set(&mut self, component: &str, key: &str, section: Section, checked: bool, label: &str) {
        self.components
            .entry(component.to_string())
            .or_default()
            .items
            .insert(
                key.to_string(),
                ItemState {
                    section,
                    checked,
                    label: label.to_string(),
                },
            );
    }

    pub fn get(&self, component: &str, key: &str) -> Option<&ItemState> {
        self.components.get(component)?.items.get(key)
    }

    /// Render the partition back into the checkbox values a form layer would
    /// submit unchanged: every item appears in its section with its check
    /// state. Feeding this into another reconciliation with the same package
    /// reproduces this state.
    pub fn to_submission(&self) -> SubmittedValues {
        let mut values = SubmittedValues::submission();
        for (component, state) in &self.components {
            for (key, item) in &state.items {
                values.set(component, item.section, key, item.checked);
            }
        }
        values
    }
}

/// Raw checkbox input from one form submission.
///
/// Per component and section: item key -> checked. A section map that is
/// absent (or empty) means the section was never rendered, which matters for
/// the fallback to the previously exported set. Keys arriving from a form
/// layer are expected to be form-encoded; see [`SubmittedValues::decoded`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedValues {
    /// False on the very first (non-submitted) render
    #[serde(default)]
    pub submitted: bool,
    #[serde(default)]
    pub components: IndexMap<String, IndexMap<Section, IndexMap<String, bool>>>,
}

impl SubmittedValues {
    /// The empty first-render input.
    pub fn first_render() -> Self {
        Self::default()
    }

    /// An empty submitted form.
    pub fn submission() -> Self {
        Self {
            submitted: true,
            components: IndexMap::new(),
        }
    }

    pub fn set(&mut self, component: &str, section: Section, key: &str, checked: bool) {
        self.components
            .entry(component.to_string())
            .or_default()
            .entry(section)
            .or_default()
            .insert(key.to_string(), checked);
    }

    fn section(&self, component: &str, section: Section) -> Option<&IndexMap<String, bool>> {
        self.components.get(component)?.get(&section)
    }

    /// Whether the checkbox exists in this submission, checked or not.
    pub fn has_value(&self, component: &str, section: Section, key: &str) -> bool {
        self.section(component, section)
            .map(|values| values.contains_key(key))
            .unwrap_or(false)
    }

    /// Whether the checkbox exists and is checked.
    pub fn is_checked(&self, component: &str, section: Section, key: &str) -> bool {
        self.section(component, section)
            .and_then(|values| values.get(key))
            .copied()
            .unwrap_or(false)
    }

    /// Decode form-encoded item keys back to raw configuration keys.
    pub fn decoded(&self) -> SubmittedValues {
        let mut decoded = SubmittedValues {
            submitted: self.submitted,
            components: IndexMap::new(),
        };
        for (component, sections) in &self.components {
            for (section, values) in sections {
                for (key, checked) in values {
                    decoded.set(component, *section, &encode::decode(key), *checked);
                }
            }
        }
        decoded
    }
}

/// Request-scoped reconciliation flags. The conflict allowance is an explicit
/// parameter here, not ambient session state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Allow configuration already exported by another package to be selected
    pub allow_conflicts: bool,
}

/// Everything one reconciliation produces.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    /// The four-way partition
    pub state: SelectionState,
    /// Working copy of the package with exclusion-driven removals applied
    pub package: Package,
    /// The newly computed selection: component type -> selected item keys
    pub config_new: IndexMap<String, IndexSet<String>>,
    /// Updated exclude/require maps
    pub constraints: SelectionConstraints,
    /// Items claimed by other exported packages: component -> key -> label
    pub conflicts: BTreeMap<String, BTreeMap<String, String>>,
    /// Config referenced by the package but absent from the live collection
    pub missing: Vec<String>,
}

impl ReconcileOutcome {
    /// The finalized config list as full names, excluding module dependencies.
    pub fn new_config_full_names(&self, collection: &ConfigCollection) -> Vec<String> {
        let mut names = Vec::new();
        for (component, keys) in &self.config_new {
            if component.as_str() == DEPENDENCIES_COMPONENT {
                continue;
            }
            for key in keys {
                names.push(collection.full_name(component, key));
            }
        }
        names
    }

    /// The finalized module dependency list.
    pub fn new_dependencies(&self) -> Vec<String> {
        self.config_new
            .get(DEPENDENCIES_COMPONENT)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Write the finalized selection back onto a package: config list,
    /// dependencies, and the exclude/require constraints. This is the only
    /// place reconciliation results are persisted.
    pub fn apply(&self, package: &mut Package, require_all: bool, collection: &ConfigCollection) {
        package.config = self.new_config_full_names(collection);
        package.dependencies = self.new_dependencies();
        package.excluded = self.constraints.full_names(Constraint::Excluded, collection);
        package.required_all = require_all;
        package.required = if require_all {
            Vec::new()
        } else {
            self.constraints.full_names(Constraint::Required, collection)
        };
    }
}

/// The selection reconciler. Borrows the manager's collection, package map
/// and module list; holds no state of its own.
pub struct SelectionReconciler<'a> {
    manager: &'a PackageManager,
}

impl<'a> SelectionReconciler<'a> {
    pub fn new(manager: &'a PackageManager) -> Self {
        Self { manager }
    }

    /// Reconcile one package against the live collection and a submission.
    ///
    /// Precedence per (component, key):
    /// 1. sources checkbox just checked -> added, checked
    /// 2. item in the new export set -> included/detected/added per the
    ///    deselection rules
    /// 3. first render, previously exported but no longer detected -> added,
    ///    checked
    /// 4. otherwise restore a checked included/added value, else sources,
    ///    unchecked
    #[instrument(skip_all, fields(package = %package.machine_name))]
    pub fn reconcile(
        &self,
        package: &Package,
        submission: &SubmittedValues,
        options: &ReconcileOptions,
    ) -> ReconcileOutcome {
        let collection = self.manager.collection();
        let packages = self.manager.packages();
        let modules = self.manager.modules();
        let mut working = package.clone();
        let package_name = working.machine_name.clone();

        // The new export set: explicit config plus the previous export,
        // expanded through dependency edges, restricted to live config.
        let seed: IndexSet<String> = working
            .config
            .iter()
            .chain(working.config_orig.iter())
            .cloned()
            .collect();
        let mut new_full = collection.expand_with_dependencies(seed.iter().map(String::as_str));

        // Conflicts and the eligible item map per component type. An item
        // claimed by a different, actually exported package is withheld from
        // selection unless conflicts are allowed or the item is part of this
        // package's original export.
        let mut conflicts: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut components: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        for ty in collection.types() {
            components.insert(ty.id.clone(), IndexMap::new());
        }
        for item in collection.items() {
            let conflicted = match item.package.as_deref() {
                Some(owner) if !owner.is_empty() && owner != package_name => packages
                    .get(owner)
                    .map(|p| p.is_exported())
                    .unwrap_or(false),
                _ => false,
            };
            if conflicted {
                conflicts
                    .entry(item.type_id.clone())
                    .or_default()
                    .insert(item.short_name.clone(), item.label.clone());
            }
            let in_orig = working.config_orig.iter().any(|n| n == &item.name);
            if options.allow_conflicts || !conflicted || in_orig {
                components
                    .entry(item.type_id.clone())
                    .or_default()
                    .insert(item.short_name.clone(), item.label.clone());
            } else {
                new_full.swap_remove(&item.name);
            }
        }
        components.retain(|_, options_map| !options_map.is_empty());

        // Module dependencies travel through the same partition as one more
        // component, with the installed modules as the option universe.
        if !modules.is_empty() {
            let deps_options: IndexMap<String, String> = modules
                .iter()
                .filter(|(name, _)| name.as_str() != package_name)
                .map(|(name, label)| (name.clone(), label.clone()))
                .collect();
            components.insert(DEPENDENCIES_COMPONENT.to_string(), deps_options);
        }

        // Previously exported map, and config missing from the live site.
        let mut exported: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        let mut missing: Vec<String> = Vec::new();
        for name in &working.config_orig {
            match collection.get(name) {
                Some(item) => {
                    exported
                        .entry(item.type_id.clone())
                        .or_default()
                        .insert(item.short_name.clone(), item.label.clone());
                }
                None => missing.push(name.clone()),
            }
        }
        if !working.dependencies_orig.is_empty() {
            let deps_exported: IndexMap<String, String> = working
                .dependencies_orig
                .iter()
                .map(|dep| (dep.clone(), self.manager.module_label(dep).to_string()))
                .collect();
            exported.insert(DEPENDENCIES_COMPONENT.to_string(), deps_exported);
        }

        // Per-component view of the new export set, plus module dependencies
        // derived from the providers of the new config.
        let mut new_info: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut detectable_deps: BTreeSet<String> = BTreeSet::new();
        for name in &new_full {
            if let Some(item) = collection.get(name) {
                new_info
                    .entry(item.type_id.clone())
                    .or_default()
                    .insert(item.short_name.clone());
                if let Some(provider) = item.provider.as_deref() {
                    if provider != package_name && modules.contains_key(provider) {
                        detectable_deps.insert(provider.to_string());
                    }
                }
            }
        }
        let mut new_deps: IndexSet<String> = working.dependencies.iter().cloned().collect();
        new_deps.extend(detectable_deps.iter().cloned());
        if !new_deps.is_empty() {
            new_info.insert(DEPENDENCIES_COMPONENT.to_string(), new_deps);
        }

        // Items of the new set reachable from another member: deselecting one
        // of these returns it to detected, because detection would pull it
        // right back.
        let detectable = collection.detectable_within(&new_full);

        // Working constraint maps, restricted to live config.
        let mut constraints = SelectionConstraints::default();
        for name in &working.excluded {
            if let Some(item) = collection.get(name) {
                constraints.insert(Constraint::Excluded, &item.type_id, &item.short_name);
            }
        }
        for name in &working.required {
            if let Some(item) = collection.get(name) {
                constraints.insert(Constraint::Required, &item.type_id, &item.short_name);
            }
        }

        // The newly computed selection per component: everything checked in
        // this submission; components with no rendered sections fall back to
        // the previously exported set.
        let empty_new: IndexSet<String> = IndexSet::new();
        let mut config_new: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for component in components.keys() {
            let mut selected: IndexSet<String> = IndexSet::new();
            let mut rendered = false;
            for section in Section::ALL {
                if let Some(values) = submission.section(component, section) {
                    if !values.is_empty() {
                        rendered = true;
                        for (key, checked) in values {
                            if *checked {
                                selected.insert(key.clone());
                            }
                        }
                    }
                }
            }
            if !rendered {
                if let Some(exp) = exported.get(component) {
                    selected.extend(exp.keys().cloned());
                }
            }
            config_new.insert(component.clone(), selected);
        }

        // Partition every eligible item.
        let empty_exported: IndexMap<String, String> = IndexMap::new();
        let mut state = SelectionState::default();
        for (component, options_map) in &components {
            let comp_exported = exported.get(component).unwrap_or(&empty_exported);
            let comp_new = new_info.get(component).unwrap_or(&empty_new);
            let comp_cfg_new = config_new.get(component).unwrap_or(&empty_new);
            let is_deps = component.as_str() == DEPENDENCIES_COMPONENT;

            for (key, label) in options_map {
                let full_name = collection.full_name(component, key);

                // 1. Checking a sources box moves the item straight to added.
                if submission.is_checked(component, Section::Sources, key) {
                    state.set(component, key, Section::Added, true, label);
                    // A previously excluded item was auto-assigned anyway, so
                    // it does not need the required marker.
                    if !constraints.remove(Constraint::Excluded, component, key) {
                        constraints.insert(Constraint::Required, component, key);
                    }
                    continue;
                }

                // 2. Item is part of the new export set (or checked in this
                // submission).
                if comp_new.contains(key) || comp_cfg_new.contains(key) {
                    let (section, checked) = if comp_exported.contains_key(key) {
                        let deselected = submission.submitted && !comp_cfg_new.contains(key);
                        if !deselected {
                            (Section::Included, true)
                        } else if (is_deps && detectable_deps.contains(key))
                            || (!is_deps && detectable.contains(&full_name))
                        {
                            // Still auto-detectable: demote to detected and
                            // record the exclusion below.
                            (Section::Detected, false)
                        } else {
                            // No longer detectable: a deselected leftover,
                            // droppable on save and re-checkable.
                            (Section::Added, false)
                        }
                    } else if !submission.submitted {
                        let excluded = constraints.contains(Constraint::Excluded, component, key);
                        (Section::Detected, !excluded)
                    } else if submission.is_checked(component, Section::Added, key) {
                        (Section::Added, true)
                    } else if !submission.is_checked(component, Section::Detected, key)
                        && !submission.has_value(component, Section::Added, key)
                    {
                        (Section::Detected, false)
                    } else {
                        (Section::Detected, true)
                    };

                    state.set(component, key, section, checked, label);
                    if section == Section::Detected && !checked {
                        // An item that was required was never auto-assigned,
                        // so deselecting it needs no exclusion record.
                        if !constraints.contains(Constraint::Required, component, key)
                            || working.required_all
                        {
                            constraints.insert(Constraint::Excluded, component, key);
                        }
                        constraints.remove(Constraint::Required, component, key);
                        if is_deps {
                            working.remove_dependency(key);
                        } else {
                            working.remove_config(&full_name);
                        }
                    } else {
                        constraints.remove(Constraint::Excluded, component, key);
                    }
                    continue;
                }

                // 3. Previously exported but no longer detected: offer it
                // back as a checked added item on the first render.
                if !submission.submitted && comp_exported.contains_key(key) {
                    state.set(component, key, Section::Added, true, label);
                    continue;
                }

                // 4. Not part of any set: restore checked included/added
                // values, else back to sources, unchecked.
                if submission.is_checked(component, Section::Included, key) {
                    state.set(component, key, Section::Included, true, label);
                } else if submission.is_checked(component, Section::Added, key) {
                    state.set(component, key, Section::Added, true, label);
                } else {
                    state.set(component, key, Section::Sources, false, label);
                }
            }
        }

        debug!(
            components = state.components.len(),
            missing = missing.len(),
            "reconciled selection"
        );

        ReconcileOutcome {
            state,
            package: working,
            config_new,
            constraints,
            conflicts,
            missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_serde_names() {
        assert_eq!(serde_json::to_string(&Section::Sources).unwrap(), "\"sources\"");
        let section: Section = serde_json::from_str("\"detected\"").unwrap();
        assert_eq!(section, Section::Detected);
    }

    #[test]
    fn test_constraints_insert_remove() {
        let mut constraints = SelectionConstraints::default();
        constraints.insert(Constraint::Excluded, "view", "frontpage");
        assert!(constraints.contains(Constraint::Excluded, "view", "frontpage"));
        assert!(!constraints.contains(Constraint::Required, "view", "frontpage"));
        assert!(constraints.remove(Constraint::Excluded, "view", "frontpage"));
        assert!(!constraints.remove(Constraint::Excluded, "view", "frontpage"));
        assert!(constraints.excluded.is_empty());
    }

    #[test]
    fn test_submitted_values_presence_vs_checked() {
        let mut values = SubmittedValues::submission();
        values.set("view", Section::Included, "frontpage", false);
        assert!(values.has_value("view", Section::Included, "frontpage"));
        assert!(!values.is_checked("view", Section::Included, "frontpage"));
        values.set("view", Section::Included, "frontpage", true);
        assert!(values.is_checked("view", Section::Included, "frontpage"));
    }

    #[test]
    fn test_submitted_values_decoded() {
        let mut values = SubmittedValues::submission();
        values.set(
            "view",
            Section::Added,
            &crate::encode::encode("fron:t.page"),
            true,
        );
        let decoded = values.decoded();
        assert!(decoded.is_checked("view", Section::Added, "fron:t.page"));
    }

    #[test]
    fn test_selection_state_round_trips_to_submission() {
        let mut state = SelectionState::default();
        state.set("view", "frontpage", Section::Included, true, "Frontpage");
        state.set("view", "archive", Section::Sources, false, "Archive");
        let submission = state.to_submission();
        assert!(submission.submitted);
        assert!(submission.is_checked("view", Section::Included, "frontpage"));
        assert!(submission.has_value("view", Section::Sources, "archive"));
        assert!(!submission.is_checked("view", Section::Sources, "archive"));
    }
}
