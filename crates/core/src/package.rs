//! Packages and bundles
//!
//! A package is an exportable bundle of configuration items, realized as an
//! installable module. It tracks the explicit config list, the list as it was
//! last exported (`config_orig`), the exclude/require constraints, module
//! dependencies, and its export status. Bundles namespace packages with a
//! machine-name prefix.

use crate::errors::PackageError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MACHINE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid machine name pattern"));

/// Validate a package machine name.
pub fn validate_machine_name(name: &str) -> Result<(), PackageError> {
    if MACHINE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(PackageError::InvalidMachineName {
            name: name.to_string(),
        })
    }
}

/// Export status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Defined in the workspace but never exported
    #[default]
    NoExport,
    /// Exported but not installed on the site
    Uninstalled,
    /// Exported and installed
    Installed,
}

/// A namespace grouping of packages sharing a machine-name prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Machine name, also the prefix applied to member packages
    pub machine_name: String,
    /// Human name
    pub name: String,
    /// The default bundle applies no prefix
    #[serde(default)]
    pub is_default: bool,
}

impl Bundle {
    /// The prefix-less default bundle.
    pub fn default_bundle() -> Self {
        Self {
            machine_name: String::new(),
            name: "Default".to_string(),
            is_default: true,
        }
    }

    /// Apply the bundle prefix to a short machine name. Names already carrying
    /// the prefix pass through unchanged.
    pub fn full_name(&self, short_name: &str) -> String {
        if self.is_default
            || short_name == self.machine_name
            || short_name.starts_with(&format!("{}_", self.machine_name))
        {
            short_name.to_string()
        } else {
            format!("{}_{}", self.machine_name, short_name)
        }
    }

    /// Strip the bundle prefix from a full machine name, if present.
    pub fn short_name<'a>(&self, full_name: &'a str) -> &'a str {
        if self.is_default {
            return full_name;
        }
        full_name
            .strip_prefix(&format!("{}_", self.machine_name))
            .unwrap_or(full_name)
    }
}

/// An exportable bundle of configuration items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Machine name, including any bundle prefix
    pub machine_name: String,
    /// Human name
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Owning bundle machine name; empty string means the default bundle
    #[serde(default)]
    pub bundle: String,
    #[serde(default)]
    pub status: PackageStatus,
    /// Current working config list (full names)
    #[serde(default)]
    pub config: Vec<String>,
    /// Config list as previously exported (full names)
    #[serde(default)]
    pub config_orig: Vec<String>,
    /// Config explicitly excluded from auto-detection (full names)
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Config explicitly required regardless of other assignment (full names)
    #[serde(default)]
    pub required: Vec<String>,
    /// Mark every config item as required on export
    #[serde(default)]
    pub required_all: bool,
    /// Current module dependencies
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Module dependencies as previously exported
    #[serde(default)]
    pub dependencies_orig: Vec<String>,
}

impl Package {
    pub fn new(machine_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            name: name.into(),
            description: String::new(),
            version: None,
            bundle: String::new(),
            status: PackageStatus::NoExport,
            config: Vec::new(),
            config_orig: Vec::new(),
            excluded: Vec::new(),
            required: Vec::new(),
            required_all: false,
            dependencies: Vec::new(),
            dependencies_orig: Vec::new(),
        }
    }

    /// Whether the package has ever been exported.
    pub fn is_exported(&self) -> bool {
        self.status != PackageStatus::NoExport
    }

    pub fn has_config(&self, name: &str) -> bool {
        self.config.iter().any(|c| c == name)
    }

    pub fn add_config(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_config(&name) {
            self.config.push(name);
        }
    }

    pub fn remove_config(&mut self, name: &str) {
        self.config.retain(|c| c != name);
    }

    pub fn remove_dependency(&mut self, module: &str) {
        self.dependencies.retain(|d| d != module);
    }
}
