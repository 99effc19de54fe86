//! Import-missing command
//!
//! Restores configuration a package references but the site is missing.
//! Items import storage-bearing types first; each failure is reported and
//! processing continues. The restored items land in the snapshot claimed by
//! the package.

use crate::cli::OutputFormat;
use crate::commands::shared::{load_manager, save_manager};
use anyhow::Result;
use confpack_core::errors::PackageError;
use confpack_core::import::{import_missing, PackageDefinitionImporter};
use confpack_core::reconcile::{ReconcileOptions, SelectionReconciler, SubmittedValues};
use std::path::PathBuf;

pub struct ImportMissingArgs {
    pub snapshot: PathBuf,
    pub package: String,
    pub output_format: OutputFormat,
}

pub fn execute(args: ImportMissingArgs) -> Result<()> {
    let mut manager = load_manager(&args.snapshot)?;
    let Some(package) = manager.package(&args.package) else {
        return Err(PackageError::NotFound { name: args.package }.into());
    };

    let outcome = SelectionReconciler::new(&manager).reconcile(
        package,
        &SubmittedValues::first_render(),
        &ReconcileOptions::default(),
    );
    if outcome.missing.is_empty() {
        println!("Nothing to import for {}", args.package);
        return Ok(());
    }

    let mut importer = PackageDefinitionImporter::new(args.package.clone());
    let report = import_missing(&mut manager, &outcome.missing, &mut importer);
    save_manager(&manager, &args.snapshot)?;

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for name in &report.imported {
                println!("Imported {}", name);
            }
            for failed in &report.failed {
                eprintln!("Error importing {}: {}", failed.name, failed.error);
            }
        }
    }
    Ok(())
}
