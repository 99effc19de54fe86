//! CLI settings
//!
//! Optional `confpack.toml` next to the snapshot provides defaults for the
//! flags most invocations repeat: the snapshot path, the export directory,
//! and the conflict allowance. Flags always win over file settings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Workspace snapshot path
    pub snapshot: Option<PathBuf>,
    /// Directory generated packages are written to
    pub export_dir: Option<PathBuf>,
    /// Allow configuration claimed by other exported packages
    #[serde(default)]
    pub allow_conflicts: bool,
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        Ok(settings)
    }
}
