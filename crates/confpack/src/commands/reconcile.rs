//! Reconcile command: dry-run selection reconciliation
//!
//! Runs the selection reconciler for one package against the live collection
//! and an optional selections file, and prints the resulting partition. The
//! snapshot is never modified; use `export` to finalize.

use crate::cli::OutputFormat;
use crate::commands::shared::{load_manager, load_selections};
use anyhow::Result;
use confpack_core::errors::PackageError;
use confpack_core::reconcile::{
    ReconcileOptions, ReconcileOutcome, Section, SelectionReconciler,
};
use std::path::PathBuf;

pub struct ReconcileArgs {
    pub snapshot: PathBuf,
    pub package: String,
    pub selections: Option<PathBuf>,
    pub allow_conflicts: bool,
    pub output_format: OutputFormat,
}

fn print_text(outcome: &ReconcileOutcome) {
    for (component, state) in &outcome.state.components {
        println!("{} ({})", component, state.items.len());
        for section in Section::ALL {
            let keys = state.section_keys(section);
            if keys.is_empty() {
                continue;
            }
            println!("  {}:", section.as_str());
            for key in keys {
                let item = &state.items[key];
                let mark = if item.checked { "x" } else { " " };
                println!("    [{}] {}  {}", mark, key, item.label);
            }
        }
    }
    if !outcome.conflicts.is_empty() {
        println!("Conflicts (claimed by another exported package):");
        for (component, items) in &outcome.conflicts {
            for (key, label) in items {
                println!("  {}/{}  {}", component, key, label);
            }
        }
    }
    if !outcome.missing.is_empty() {
        println!("Configuration missing from the site:");
        for name in &outcome.missing {
            println!("  {}", name);
        }
        println!("Run import-missing to restore it before exporting.");
    }
}

pub fn execute(args: ReconcileArgs) -> Result<()> {
    let manager = load_manager(&args.snapshot)?;
    let Some(package) = manager.package(&args.package) else {
        return Err(PackageError::NotFound { name: args.package }.into());
    };
    let submission = load_selections(args.selections.as_deref())?;
    let reconciler = SelectionReconciler::new(&manager);
    let outcome = reconciler.reconcile(
        package,
        &submission,
        &ReconcileOptions {
            allow_conflicts: args.allow_conflicts,
        },
    );

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_text(&outcome),
    }
    Ok(())
}
