//! Configuration items and component types
//!
//! A configuration item is one named piece of site configuration (a view, a
//! field, a content type). Items are grouped into component types, each of
//! which owns a config-name prefix; the full name of an item is
//! `<prefix>.<short name>`. Items carry their human label, the package that
//! currently claims them, the module that provides them, and their dependency
//! edges: everything the selection reconciler needs, snapshotted per request.

use serde::{Deserialize, Serialize};

/// Type id used for config names that match no declared prefix.
pub const SIMPLE_TYPE: &str = "simple";

/// Pseudo component type carrying module dependencies through the partition.
pub const DEPENDENCIES_COMPONENT: &str = "dependencies";

/// A component type: a category of configuration such as views or fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigType {
    /// Type id, e.g. `view`
    pub id: String,
    /// Human label, e.g. `Views`
    pub label: String,
    /// Config-name prefix, e.g. `views.view`. `None` for the simple type.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl ConfigType {
    pub fn new(id: impl Into<String>, label: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// The built-in fallback type for prefix-less config names.
    pub fn simple() -> Self {
        Self {
            id: SIMPLE_TYPE.to_string(),
            label: "Simple configuration".to_string(),
            prefix: None,
        }
    }
}

/// One configuration item, immutable for the duration of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    /// Full config name, e.g. `views.view.frontpage`
    pub name: String,
    /// Component type id, derived from the name prefix
    pub type_id: String,
    /// Short name within the component type, e.g. `frontpage`
    pub short_name: String,
    /// Human label
    pub label: String,
    /// Machine name of the package currently claiming this item, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Module providing the item's type, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Full names of configuration this item depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ConfigItem {
    /// Whether the item is claimed by the given package.
    pub fn claimed_by(&self, package_name: &str) -> bool {
        self.package.as_deref() == Some(package_name)
    }
}
