//! Package generation
//!
//! Turns a finalized package into exportable module output. Two generation
//! methods exist: `write` produces a module directory with an `info.yml`, a
//! `features.yml` and the per-item config manifests; `archive` produces the
//! same tree as a `.tar.gz`. Generation failures are reported per package so
//! one broken package never blocks the rest.

use crate::errors::GenerateError;
use crate::manager::PackageManager;
use crate::package::{Package, PackageStatus};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options shared by all generation methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Drop config missing from the live site instead of refusing to generate
    pub allow_missing: bool,
}

/// Result of generating one package.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPackage {
    pub machine_name: String,
    /// Module directory or archive path
    pub path: PathBuf,
    /// Number of files written (or archived)
    pub files: usize,
    /// The package as it stands after export: config_orig refreshed, status
    /// bumped out of no-export
    pub package: Package,
}

/// A generation method.
pub trait Generator {
    fn method_id(&self) -> &'static str;

    fn generate(
        &self,
        package: &Package,
        manager: &PackageManager,
        options: &GenerateOptions,
    ) -> Result<GeneratedPackage, GenerateError>;
}

#[derive(Serialize)]
struct InfoManifest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequiredField {
    All(bool),
    List(Vec<String>),
}

#[derive(Serialize)]
struct FeaturesManifest<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    bundle: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    excluded: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<RequiredField>,
}

#[derive(Serialize)]
struct ItemManifest<'a> {
    label: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<&'a str>,
}

/// Render the file tree for one package as (relative path, content) pairs.
///
/// Missing config either fails generation or, with `allow_missing`, is
/// dropped from the output with a warning.
fn package_files(
    package: &Package,
    manager: &PackageManager,
    options: &GenerateOptions,
) -> Result<Vec<(String, String)>, GenerateError> {
    let collection = manager.collection();
    let missing: Vec<String> = package
        .config
        .iter()
        .filter(|name| !collection.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        if !options.allow_missing {
            return Err(GenerateError::MissingConfig {
                name: package.machine_name.clone(),
                missing,
            });
        }
        warn!(
            package = %package.machine_name,
            dropped = missing.len(),
            "dropping config missing from the live site"
        );
    }

    let mut files = Vec::new();

    let info = InfoManifest {
        name: &package.name,
        description: &package.description,
        kind: "module",
        version: package.version.as_deref(),
        dependencies: package.dependencies.iter().map(String::as_str).collect(),
    };
    files.push((
        format!("{}.info.yml", package.machine_name),
        serde_yaml::to_string(&info)?,
    ));

    let required = if package.required_all {
        Some(RequiredField::All(true))
    } else if package.required.is_empty() {
        None
    } else {
        Some(RequiredField::List(package.required.clone()))
    };
    let features = FeaturesManifest {
        bundle: &package.bundle,
        excluded: package.excluded.iter().map(String::as_str).collect(),
        required,
    };
    files.push((
        format!("{}.features.yml", package.machine_name),
        serde_yaml::to_string(&features)?,
    ));

    for name in &package.config {
        if let Some(item) = collection.get(name) {
            let manifest = ItemManifest {
                label: &item.label,
                dependencies: item.dependencies.iter().map(String::as_str).collect(),
            };
            files.push((
                format!("config/install/{}.yml", name),
                serde_yaml::to_string(&manifest)?,
            ));
        }
    }

    Ok(files)
}

/// Mark the package as exported: refresh the orig lists and bump the status.
fn exported_copy(package: &Package) -> Package {
    let mut exported = package.clone();
    exported.config_orig = exported.config.clone();
    exported.dependencies_orig = exported.dependencies.clone();
    if exported.status == PackageStatus::NoExport {
        exported.status = PackageStatus::Uninstalled;
    }
    exported
}

/// Writes packages as module directories under a root path.
pub struct WriteGenerator {
    root: PathBuf,
}

impl WriteGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Generator for WriteGenerator {
    fn method_id(&self) -> &'static str {
        "write"
    }

    fn generate(
        &self,
        package: &Package,
        manager: &PackageManager,
        options: &GenerateOptions,
    ) -> Result<GeneratedPackage, GenerateError> {
        let files = package_files(package, manager, options)?;
        let package_dir = self.root.join(&package.machine_name);
        for (relative, content) in &files {
            let path = package_dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }
        debug!(package = %package.machine_name, files = files.len(), "wrote package");
        Ok(GeneratedPackage {
            machine_name: package.machine_name.clone(),
            path: package_dir,
            files: files.len(),
            package: exported_copy(package),
        })
    }
}

/// Packs packages as `.tar.gz` archives under a root path.
pub struct ArchiveGenerator {
    root: PathBuf,
}

impl ArchiveGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Generator for ArchiveGenerator {
    fn method_id(&self) -> &'static str {
        "archive"
    }

    fn generate(
        &self,
        package: &Package,
        manager: &PackageManager,
        options: &GenerateOptions,
    ) -> Result<GeneratedPackage, GenerateError> {
        let files = package_files(package, manager, options)?;
        std::fs::create_dir_all(&self.root)?;
        let archive_path = self.root.join(format!("{}.tar.gz", package.machine_name));
        let file = std::fs::File::create(&archive_path)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (relative, content) in &files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            let entry_path = format!("{}/{}", package.machine_name, relative);
            builder.append_data(&mut header, entry_path, content.as_bytes())?;
        }
        builder.into_inner()?.finish()?;
        debug!(package = %package.machine_name, files = files.len(), "archived package");
        Ok(GeneratedPackage {
            machine_name: package.machine_name.clone(),
            path: archive_path,
            files: files.len(),
            package: exported_copy(package),
        })
    }
}

/// One failed package in a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct FailedPackage {
    pub machine_name: String,
    pub error: String,
}

/// Outcome of generating a batch of packages. Failures are collected, not
/// propagated, so remaining packages still generate.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub method: String,
    pub generated_at: DateTime<Utc>,
    pub generated: Vec<GeneratedPackage>,
    pub failed: Vec<FailedPackage>,
}

/// Generate every named package with the given method, continuing past
/// per-package failures.
pub fn generate_packages(
    generator: &dyn Generator,
    package_names: &[String],
    manager: &PackageManager,
    options: &GenerateOptions,
) -> GenerationReport {
    let mut report = GenerationReport {
        method: generator.method_id().to_string(),
        generated_at: Utc::now(),
        generated: Vec::new(),
        failed: Vec::new(),
    };
    for name in package_names {
        let Some(package) = manager.package(name) else {
            report.failed.push(FailedPackage {
                machine_name: name.clone(),
                error: format!("Package not found: {}", name),
            });
            continue;
        };
        match generator.generate(package, manager, options) {
            Ok(generated) => report.generated.push(generated),
            Err(error) => {
                warn!(package = %name, %error, "package generation failed");
                report.failed.push(FailedPackage {
                    machine_name: name.clone(),
                    error: error.to_string(),
                });
            }
        }
    }
    report
}
