//! Export command: finalize and generate a package
//!
//! Reconciles the package's selection, writes the finalized config list and
//! constraints back onto the package, generates the export output with the
//! chosen method, and persists the updated package to the snapshot. A package
//! referencing configuration missing from the site is refused unless
//! conflicts are allowed, in which case the missing items are dropped from
//! the output.

use crate::cli::{GenerationMethod, OutputFormat};
use crate::commands::shared::{load_manager, load_selections, save_manager};
use anyhow::{bail, Result};
use confpack_core::errors::PackageError;
use confpack_core::generate::{
    generate_packages, ArchiveGenerator, GenerateOptions, Generator, WriteGenerator,
};
use confpack_core::reconcile::{ReconcileOptions, SelectionReconciler};
use std::path::PathBuf;
use tracing::info;

pub struct ExportArgs {
    pub snapshot: PathBuf,
    pub package: String,
    pub selections: Option<PathBuf>,
    pub allow_conflicts: bool,
    pub require_all: bool,
    pub method: GenerationMethod,
    pub out_dir: PathBuf,
    pub output_format: OutputFormat,
}

pub fn execute(args: ExportArgs) -> Result<()> {
    let mut manager = load_manager(&args.snapshot)?;
    let Some(package) = manager.package(&args.package) else {
        return Err(PackageError::NotFound { name: args.package }.into());
    };
    let submission = load_selections(args.selections.as_deref())?;

    let outcome = SelectionReconciler::new(&manager).reconcile(
        package,
        &submission,
        &ReconcileOptions {
            allow_conflicts: args.allow_conflicts,
        },
    );
    if !outcome.missing.is_empty() && !args.allow_conflicts {
        bail!(
            "Package {} references configuration missing from the site: {}.\n\
             Run import-missing to restore it, or pass --allow-conflicts to drop it.",
            args.package,
            outcome.missing.join(", ")
        );
    }

    // Finalize the selection on a fresh copy and store it before generating.
    let mut finalized = package.clone();
    outcome.apply(&mut finalized, args.require_all, manager.collection());
    manager.set_package(finalized);

    let generator: Box<dyn Generator> = match args.method {
        GenerationMethod::Write => Box::new(WriteGenerator::new(&args.out_dir)),
        GenerationMethod::Archive => Box::new(ArchiveGenerator::new(&args.out_dir)),
    };
    let report = generate_packages(
        generator.as_ref(),
        &[args.package.clone()],
        &manager,
        &GenerateOptions {
            allow_missing: args.allow_conflicts,
        },
    );

    // Exported packages come back with refreshed orig lists; keep those.
    for generated in &report.generated {
        manager.set_package(generated.package.clone());
        info!(package = %generated.machine_name, path = %generated.path.display(), "generated package");
    }
    save_manager(&manager, &args.snapshot)?;

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for generated in &report.generated {
                println!(
                    "Generated {} ({} files) at {}",
                    generated.machine_name,
                    generated.files,
                    generated.path.display()
                );
            }
            for failed in &report.failed {
                eprintln!("Failed {}: {}", failed.machine_name, failed.error);
            }
        }
    }

    if report.generated.is_empty() {
        bail!("No packages were generated");
    }
    Ok(())
}
