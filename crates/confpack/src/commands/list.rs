//! List command: export preview
//!
//! Shows every package with its configuration grouped by component type, the
//! module dependencies resolved to labels, and a synthetic `unpackaged`
//! package collecting configuration no package claims.

use crate::cli::OutputFormat;
use crate::commands::shared::{load_manager, status_str};
use anyhow::Result;
use confpack_core::errors::PackageError;
use confpack_core::manager::PackageManager;
use confpack_core::package::Package;
use confpack_core::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

pub struct ListArgs {
    pub snapshot: PathBuf,
    pub package: Option<String>,
    pub output_format: OutputFormat,
}

#[derive(Serialize)]
struct PreviewItem {
    name: String,
    label: String,
}

#[derive(Serialize)]
struct PackagePreview {
    machine_name: String,
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    status: String,
    /// Component type label -> items
    components: IndexMap<String, Vec<PreviewItem>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<PreviewItem>,
}

fn group_by_type(manager: &PackageManager, config: &[String]) -> IndexMap<String, Vec<PreviewItem>> {
    let collection = manager.collection();
    let mut components: IndexMap<String, Vec<PreviewItem>> = IndexMap::new();
    for ty in collection.types() {
        components.insert(ty.label.clone(), Vec::new());
    }
    for name in config {
        let (label, item) = match collection.get(name) {
            Some(item) => (
                collection.type_label(&item.type_id).to_string(),
                PreviewItem {
                    name: name.clone(),
                    label: item.label.clone(),
                },
            ),
            None => (
                "Missing".to_string(),
                PreviewItem {
                    name: name.clone(),
                    label: "(missing from site)".to_string(),
                },
            ),
        };
        components.entry(label).or_default().push(item);
    }
    components.retain(|_, items| !items.is_empty());
    components
}

fn preview(manager: &PackageManager, package: &Package) -> PackagePreview {
    PackagePreview {
        machine_name: package.machine_name.clone(),
        name: package.name.clone(),
        description: package.description.clone(),
        status: status_str(package.status).to_string(),
        components: group_by_type(manager, &package.config),
        dependencies: package
            .dependencies
            .iter()
            .map(|dep| PreviewItem {
                name: dep.clone(),
                label: manager.module_label(dep).to_string(),
            })
            .collect(),
    }
}

fn unpackaged_preview(manager: &PackageManager) -> PackagePreview {
    let config: Vec<String> = manager
        .unpackaged()
        .iter()
        .map(|item| item.name.clone())
        .collect();
    PackagePreview {
        machine_name: "unpackaged".to_string(),
        name: "Unpackaged".to_string(),
        description: "Configuration that has not been added to any package.".to_string(),
        status: status_str(Default::default()).to_string(),
        components: group_by_type(manager, &config),
        dependencies: Vec::new(),
    }
}

pub fn execute(args: ListArgs) -> Result<()> {
    let manager = load_manager(&args.snapshot)?;
    debug!(packages = manager.packages().len(), "listing packages");

    let mut previews = Vec::new();
    match &args.package {
        Some(name) => match manager.package(name) {
            Some(package) => previews.push(preview(&manager, package)),
            None => {
                return Err(PackageError::NotFound { name: name.clone() }.into());
            }
        },
        None => {
            for package in manager.packages().values() {
                previews.push(preview(&manager, package));
            }
            previews.push(unpackaged_preview(&manager));
        }
    }

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&previews)?),
        OutputFormat::Text => {
            for p in &previews {
                println!("{}: {} ({})", p.machine_name, p.name, p.status);
                for (type_label, items) in &p.components {
                    println!("  {}", type_label);
                    for item in items {
                        println!("    {}  {}", item.name, item.label);
                    }
                }
                if !p.dependencies.is_empty() {
                    println!("  Dependencies");
                    for dep in &p.dependencies {
                        println!("    {}  {}", dep.name, dep.label);
                    }
                }
                println!();
            }
        }
    }
    Ok(())
}
