//! Scenario suite for selection reconciliation
//!
//! Covers the documented checkbox flows end to end on one fixture site:
//! - unmodified submissions keep exported config included and checked
//! - deselecting an exported item demotes it to detected (still detectable)
//!   or added (no longer detectable), and exclusions stick across refreshes
//! - checking a sources box promotes to added and records the requirement
//! - conflicts are withheld unless allowed, missing config is advisory
//! - the partition is complete, lossless for exported config, and idempotent

use confpack_core::item::{ConfigType, DEPENDENCIES_COMPONENT};
use confpack_core::manager::PackageManager;
use confpack_core::package::{Package, PackageStatus};
use confpack_core::reconcile::{
    Constraint, ReconcileOptions, Section, SelectionReconciler, SubmittedValues,
};
use confpack_core::snapshot::{ConfigItemRecord, WorkspaceSnapshot};
use indexmap::IndexMap;

fn item(
    name: &str,
    label: &str,
    package: Option<&str>,
    provider: Option<&str>,
    dependencies: &[&str],
) -> ConfigItemRecord {
    ConfigItemRecord {
        name: name.to_string(),
        label: label.to_string(),
        package: package.map(str::to_string),
        provider: provider.map(str::to_string),
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
    }
}

/// One site: a gallery package exporting a view that pulls in a field and its
/// storage, an unclaimed archive view, plain site settings, and a view owned
/// by another exported package.
fn fixture() -> PackageManager {
    let mut gallery = Package::new("gallery", "Gallery");
    gallery.status = PackageStatus::Installed;
    gallery.config = vec![
        "views.view.gallery".to_string(),
        "field.field.node.image".to_string(),
        "field.storage.node.image".to_string(),
    ];
    gallery.config_orig = gallery.config.clone();
    gallery.dependencies = vec!["views".to_string(), "image".to_string()];
    gallery.dependencies_orig = gallery.dependencies.clone();

    let mut other = Package::new("other", "Other");
    other.status = PackageStatus::Installed;
    other.config = vec!["views.view.claimed".to_string()];
    other.config_orig = other.config.clone();

    let snapshot = WorkspaceSnapshot {
        types: vec![
            ConfigType::new("view", "Views", "views.view"),
            ConfigType::new("field_storage", "Field storage", "field.storage"),
            ConfigType::new("field", "Fields", "field.field"),
        ],
        modules: IndexMap::from([
            ("views".to_string(), "Views".to_string()),
            ("image".to_string(), "Image".to_string()),
            ("node".to_string(), "Node".to_string()),
        ]),
        bundles: vec![],
        items: vec![
            item(
                "views.view.gallery",
                "Gallery view",
                Some("gallery"),
                Some("views"),
                &["field.field.node.image"],
            ),
            item(
                "field.field.node.image",
                "Image field",
                Some("gallery"),
                Some("image"),
                &["field.storage.node.image"],
            ),
            item(
                "field.storage.node.image",
                "Image field storage",
                Some("gallery"),
                Some("image"),
                &[],
            ),
            item(
                "views.view.archive",
                "Archive view",
                None,
                Some("views"),
                &[],
            ),
            item("system.site", "Site information", None, None, &[]),
            item(
                "views.view.claimed",
                "Claimed view",
                Some("other"),
                Some("views"),
                &[],
            ),
        ],
        packages: vec![gallery, other],
    };
    PackageManager::from_snapshot(snapshot).unwrap()
}

fn section_of(
    outcome: &confpack_core::reconcile::ReconcileOutcome,
    component: &str,
    key: &str,
) -> (Section, bool) {
    let state = outcome
        .state
        .get(component, key)
        .unwrap_or_else(|| panic!("{}/{} not partitioned", component, key));
    (state.section, state.checked)
}

#[test]
fn first_render_keeps_exported_config_included() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let outcome = reconciler.reconcile(
        package,
        &SubmittedValues::first_render(),
        &ReconcileOptions::default(),
    );

    assert_eq!(
        section_of(&outcome, "view", "gallery"),
        (Section::Included, true)
    );
    assert_eq!(
        section_of(&outcome, "field", "node.image"),
        (Section::Included, true)
    );
    assert_eq!(
        section_of(&outcome, "field_storage", "node.image"),
        (Section::Included, true)
    );
    assert_eq!(
        section_of(&outcome, "view", "archive"),
        (Section::Sources, false)
    );
    assert_eq!(
        section_of(&outcome, "simple", "system.site"),
        (Section::Sources, false)
    );
    assert_eq!(
        section_of(&outcome, DEPENDENCIES_COMPONENT, "views"),
        (Section::Included, true)
    );
    assert!(outcome.missing.is_empty());
}

#[test]
fn unmodified_submission_changes_nothing() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let resubmitted = reconciler.reconcile(package, &first.state.to_submission(), &options);
    assert_eq!(first.state, resubmitted.state);
    assert_eq!(first.constraints, resubmitted.constraints);

    // And again: a refresh of a refresh drifts nowhere.
    let again = reconciler.reconcile(package, &resubmitted.state.to_submission(), &options);
    assert_eq!(resubmitted.state, again.state);
}

#[test]
fn reconcile_is_a_pure_function_of_its_inputs() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();
    let mut submission = SubmittedValues::submission();
    submission.set("view", Section::Included, "gallery", false);
    submission.set("field", Section::Included, "node.image", true);

    let one = reconciler.reconcile(package, &submission, &options);
    let two = reconciler.reconcile(package, &submission, &options);
    assert_eq!(one.state, two.state);
    assert_eq!(one.config_new, two.config_new);
    assert_eq!(one.constraints, two.constraints);
    assert_eq!(one.package, two.package);
}

#[test]
fn deselecting_detectable_item_demotes_to_detected_and_excludes() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut submission = first.state.to_submission();
    // The gallery view depends on the field, so deselecting the field cannot
    // free it: detection pulls it back, unchecked.
    submission.set("field", Section::Included, "node.image", false);
    let outcome = reconciler.reconcile(package, &submission, &options);

    assert_eq!(
        section_of(&outcome, "field", "node.image"),
        (Section::Detected, false)
    );
    assert!(outcome
        .constraints
        .contains(Constraint::Excluded, "field", "node.image"));
    assert!(!outcome.package.has_config("field.field.node.image"));
    // The storage was still checked, so it stays included.
    assert_eq!(
        section_of(&outcome, "field_storage", "node.image"),
        (Section::Included, true)
    );

    // The exclusion sticks across a refresh with no further edits.
    let refreshed = reconciler.reconcile(package, &outcome.state.to_submission(), &options);
    assert_eq!(
        section_of(&refreshed, "field", "node.image"),
        (Section::Detected, false)
    );
    assert!(refreshed
        .constraints
        .contains(Constraint::Excluded, "field", "node.image"));
}

#[test]
fn deselecting_undetectable_item_demotes_to_added_unchecked() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut submission = first.state.to_submission();
    // Nothing depends on the gallery view itself.
    submission.set("view", Section::Included, "gallery", false);
    let outcome = reconciler.reconcile(package, &submission, &options);

    assert_eq!(
        section_of(&outcome, "view", "gallery"),
        (Section::Added, false)
    );
    assert!(!outcome
        .constraints
        .contains(Constraint::Excluded, "view", "gallery"));
    // Dropped from the new selection, so a save would remove it.
    let full_names = outcome.new_config_full_names(manager.collection());
    assert!(!full_names.contains(&"views.view.gallery".to_string()));

    // Re-checking the added box returns it to included.
    let mut recheck = outcome.state.to_submission();
    recheck.set("view", Section::Added, "gallery", true);
    let restored = reconciler.reconcile(package, &recheck, &options);
    assert_eq!(
        section_of(&restored, "view", "gallery"),
        (Section::Included, true)
    );
}

#[test]
fn checking_sources_box_promotes_to_added_and_requires() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut submission = first.state.to_submission();
    submission.set("view", Section::Sources, "archive", true);
    let outcome = reconciler.reconcile(package, &submission, &options);

    assert_eq!(
        section_of(&outcome, "view", "archive"),
        (Section::Added, true)
    );
    assert!(outcome
        .constraints
        .contains(Constraint::Required, "view", "archive"));
    assert!(outcome
        .new_config_full_names(manager.collection())
        .contains(&"views.view.archive".to_string()));
}

#[test]
fn checking_sources_box_on_previously_excluded_item_clears_exclusion_only() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let mut package = manager.package("gallery").unwrap().clone();
    package.excluded = vec!["views.view.archive".to_string()];

    let mut submission = SubmittedValues::submission();
    submission.set("view", Section::Sources, "archive", true);
    let outcome = reconciler.reconcile(&package, &submission, &ReconcileOptions::default());

    assert_eq!(
        section_of(&outcome, "view", "archive"),
        (Section::Added, true)
    );
    // It was auto-assignable before the exclusion, so no required marker.
    assert!(!outcome
        .constraints
        .contains(Constraint::Required, "view", "archive"));
    assert!(!outcome
        .constraints
        .contains(Constraint::Excluded, "view", "archive"));
}

#[test]
fn excluded_detected_item_renders_unchecked_on_first_load() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    // A fresh package that explicitly lists the view; the field and storage
    // arrive by detection, but the field was excluded earlier.
    let mut package = Package::new("fresh", "Fresh");
    package.config = vec!["views.view.gallery".to_string()];
    package.excluded = vec!["field.field.node.image".to_string()];

    let outcome = reconciler.reconcile(
        &package,
        &SubmittedValues::first_render(),
        &ReconcileOptions {
            allow_conflicts: true,
        },
    );

    assert_eq!(
        section_of(&outcome, "field", "node.image"),
        (Section::Detected, false)
    );
    assert!(outcome
        .constraints
        .contains(Constraint::Excluded, "field", "node.image"));
    // The storage arrives by detection and defaults to checked.
    assert_eq!(
        section_of(&outcome, "field_storage", "node.image"),
        (Section::Detected, true)
    );
}

#[test]
fn deselecting_module_dependency_removes_it_from_the_working_package() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut submission = first.state.to_submission();
    submission.set(DEPENDENCIES_COMPONENT, Section::Included, "image", false);
    let outcome = reconciler.reconcile(package, &submission, &options);

    // Providers of the exported config stay detectable, so the module demotes
    // to detected rather than dropping to sources.
    assert_eq!(
        section_of(&outcome, DEPENDENCIES_COMPONENT, "image"),
        (Section::Detected, false)
    );
    assert!(!outcome
        .package
        .dependencies
        .contains(&"image".to_string()));
    // Module exclusions never persist as config names.
    assert!(outcome
        .constraints
        .full_names(Constraint::Excluded, manager.collection())
        .is_empty());
}

#[test]
fn conflicts_are_withheld_unless_allowed() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();

    let strict = reconciler.reconcile(
        package,
        &SubmittedValues::first_render(),
        &ReconcileOptions::default(),
    );
    assert!(strict.state.get("view", "claimed").is_none());
    assert_eq!(
        strict.conflicts.get("view").and_then(|c| c.get("claimed")),
        Some(&"Claimed view".to_string())
    );

    let relaxed = reconciler.reconcile(
        package,
        &SubmittedValues::first_render(),
        &ReconcileOptions {
            allow_conflicts: true,
        },
    );
    assert_eq!(
        section_of(&relaxed, "view", "claimed"),
        (Section::Sources, false)
    );
    // Still reported as a conflict either way.
    assert!(relaxed.conflicts.get("view").is_some());
}

#[test]
fn missing_config_is_reported_and_never_partitioned() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let mut package = manager.package("gallery").unwrap().clone();
    package.config_orig.push("views.view.lost".to_string());

    let outcome = reconciler.reconcile(
        &package,
        &SubmittedValues::first_render(),
        &ReconcileOptions::default(),
    );
    assert_eq!(outcome.missing, vec!["views.view.lost".to_string()]);
    assert!(outcome.state.get("view", "lost").is_none());
}

#[test]
fn partition_is_complete_over_eligible_items() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    for submission in [SubmittedValues::first_render(), {
        let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
        let mut s = first.state.to_submission();
        s.set("view", Section::Included, "gallery", false);
        s.set("field", Section::Included, "node.image", false);
        s
    }] {
        let outcome = reconciler.reconcile(package, &submission, &options);
        let mut partitioned = 0;
        for state in outcome.state.components.values() {
            partitioned += state.items.len();
        }
        // All live items except the withheld conflict, plus the three modules.
        let eligible = manager.collection().len() - 1 + manager.modules().len();
        assert_eq!(partitioned, eligible);
    }
}

#[test]
fn exported_config_never_lands_in_unchecked_sources() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut deselect_everything = first.state.to_submission();
    for name in &package.config_orig {
        let (component, key) = manager.collection().parse_name(name);
        deselect_everything.set(&component, Section::Included, &key, false);
    }
    for submission in [
        SubmittedValues::first_render(),
        first.state.to_submission(),
        deselect_everything,
    ] {
        let outcome = reconciler.reconcile(package, &submission, &options);
        for name in &package.config_orig {
            let (component, key) = manager.collection().parse_name(name);
            let state = outcome
                .state
                .get(&component, &key)
                .expect("exported item partitioned");
            assert_ne!(
                state.section,
                Section::Sources,
                "{} fell out of the package",
                name
            );
        }
    }
}

#[test]
fn apply_writes_selection_and_constraints_back_to_the_package() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();
    let options = ReconcileOptions::default();

    let first = reconciler.reconcile(package, &SubmittedValues::first_render(), &options);
    let mut submission = first.state.to_submission();
    submission.set("field", Section::Included, "node.image", false);
    submission.set("view", Section::Sources, "archive", true);
    let outcome = reconciler.reconcile(package, &submission, &options);

    let mut updated = package.clone();
    outcome.apply(&mut updated, false, manager.collection());

    assert!(updated.config.contains(&"views.view.archive".to_string()));
    assert!(!updated.config.contains(&"field.field.node.image".to_string()));
    assert_eq!(updated.excluded, vec!["field.field.node.image".to_string()]);
    assert_eq!(updated.required, vec!["views.view.archive".to_string()]);
    assert!(!updated.required_all);

    let mut required_all = package.clone();
    outcome.apply(&mut required_all, true, manager.collection());
    assert!(required_all.required_all);
    assert!(required_all.required.is_empty());
}

#[test]
fn encoded_submission_keys_decode_before_reconciliation() {
    let manager = fixture();
    let reconciler = SelectionReconciler::new(&manager);
    let package = manager.package("gallery").unwrap();

    let mut form = SubmittedValues::submission();
    // A form layer submits `node.image` with its dot encoded.
    form.set(
        "field",
        Section::Included,
        &confpack_core::encode::encode("node.image"),
        true,
    );
    let outcome = reconciler.reconcile(package, &form.decoded(), &ReconcileOptions::default());
    assert_eq!(
        section_of(&outcome, "field", "node.image"),
        (Section::Included, true)
    );
}
