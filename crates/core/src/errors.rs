//! Error types and handling
//!
//! This module provides domain-specific error types for the package workspace.
//! The error taxonomy is structured with specific error enums for each domain
//! (Snapshot, Package, Generate, Import) that are then wrapped in the main
//! ConfpackError enum for unified error handling.
//!
//! Selection reconciliation deliberately has no error variants of its own:
//! malformed or unknown selection keys degrade to the sources/unchecked branch
//! and missing configuration is reported as an advisory list, never a failure.

use thiserror::Error;

/// Workspace snapshot errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Snapshot file parsing error
    #[error("Failed to parse workspace snapshot: {message}")]
    Parsing { message: String },

    /// Snapshot validation error
    #[error("Snapshot validation error: {message}")]
    Validation { message: String },

    /// Snapshot file I/O error
    #[error("Failed to read workspace snapshot")]
    Io(#[from] std::io::Error),

    /// Snapshot file not found
    #[error("Workspace snapshot not found: {path}")]
    NotFound { path: String },

    /// JSON serialization error
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

/// Package-related errors
#[derive(Error, Debug)]
pub enum PackageError {
    /// Package not found in the workspace
    #[error("Package not found: {name}")]
    NotFound { name: String },

    /// Invalid machine name
    #[error("Invalid machine name '{name}': may only contain lowercase letters, numbers and underscores")]
    InvalidMachineName { name: String },

    /// Machine name already taken by an exported package or installed module
    #[error("Machine name already in use: {name}")]
    NameTaken { name: String },

    /// Unknown bundle reference
    #[error("Unknown bundle: {name}")]
    UnknownBundle { name: String },
}

/// Package generation errors
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Generation output I/O error
    #[error("Failed to write package output")]
    Io(#[from] std::io::Error),

    /// Manifest serialization error
    #[error("Failed to serialize package manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),

    /// Package cannot be generated while configuration is missing from the site
    #[error("Package {name} references configuration missing from the site: {missing:?}")]
    MissingConfig { name: String, missing: Vec<String> },
}

/// Missing-configuration import errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// The item is already present in the live collection
    #[error("Configuration already active: {name}")]
    AlreadyExists { name: String },

    /// The importer has no source data for the item
    #[error("No exported data available for {name}")]
    NoSource { name: String },

    /// Underlying import failure
    #[error("Import failed: {message}")]
    Failed { message: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum ConfpackError {
    /// Workspace snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Package-related errors
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Package generation errors
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    /// Missing-configuration import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),
}

/// Convenience type alias for Results with ConfpackError
pub type Result<T> = std::result::Result<T, ConfpackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_snapshot_error_display() {
        let error = SnapshotError::Parsing {
            message: "Invalid JSON".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Failed to parse workspace snapshot: Invalid JSON"
        );

        let error = SnapshotError::NotFound {
            path: "/path/to/site.json".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Workspace snapshot not found: /path/to/site.json"
        );
    }

    #[test]
    fn test_package_error_display() {
        let error = PackageError::NotFound {
            name: "gallery".to_string(),
        };
        assert_eq!(format!("{}", error), "Package not found: gallery");

        let error = PackageError::InvalidMachineName {
            name: "Bad Name".to_string(),
        };
        assert!(format!("{}", error).contains("Bad Name"));

        let error = PackageError::NameTaken {
            name: "node".to_string(),
        };
        assert_eq!(format!("{}", error), "Machine name already in use: node");
    }

    #[test]
    fn test_import_error_display() {
        let error = ImportError::AlreadyExists {
            name: "views.view.frontpage".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Configuration already active: views.view.frontpage"
        );
    }

    #[test]
    fn test_confpack_error_from_domain_errors() {
        let snapshot_error = SnapshotError::Parsing {
            message: "Test".to_string(),
        };
        let error: ConfpackError = snapshot_error.into();
        assert!(matches!(error, ConfpackError::Snapshot(_)));

        let package_error = PackageError::NotFound {
            name: "x".to_string(),
        };
        let error: ConfpackError = package_error.into();
        assert!(matches!(error, ConfpackError::Package(_)));

        let import_error = ImportError::Failed {
            message: "boom".to_string(),
        };
        let error: ConfpackError = import_error.into();
        assert!(matches!(error, ConfpackError::Import(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let snapshot_error: SnapshotError = io_error.into();
        assert!(matches!(snapshot_error, SnapshotError::Io(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let snapshot_error = SnapshotError::Io(io_error);
        let error = ConfpackError::Snapshot(snapshot_error);

        assert!(error.source().is_some());
        if let Some(source) = error.source() {
            assert!(source.source().is_some()); // The underlying io::Error
        }
    }
}
