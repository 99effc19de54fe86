//! CLI definition and dispatch

use crate::commands;
use crate::settings::Settings;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

impl LogFormat {
    fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

/// Package generation methods
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GenerationMethod {
    /// Write module directories
    Write,
    /// Pack tar.gz archives
    Archive,
}

/// confpack subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Define a new package in the workspace
    Init {
        /// Short machine name (the bundle prefix is added automatically)
        short_name: String,
        /// Human name (defaults to the short name)
        #[arg(long)]
        name: Option<String>,
        /// Short description of the package
        #[arg(long)]
        description: Option<String>,
        /// Package version, e.g. 1.0.0
        #[arg(long)]
        version: Option<String>,
        /// Bundle machine name (defaults to the default bundle)
        #[arg(long)]
        bundle: Option<String>,
    },
    /// Preview every package and its configuration by component type
    List {
        /// Limit the preview to one package
        #[arg(long)]
        package: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
    /// Reconcile a package's selection against the live configuration
    Reconcile {
        /// Package machine name
        package: String,
        /// Selections file (form submission values as JSON; omit for a first render)
        #[arg(long)]
        selections: Option<PathBuf>,
        /// Allow configuration claimed by other exported packages
        #[arg(long)]
        allow_conflicts: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
    /// Finalize a package's selection and generate its export output
    Export {
        /// Package machine name
        package: String,
        /// Selections file (form submission values as JSON; omit to export as-is)
        #[arg(long)]
        selections: Option<PathBuf>,
        /// Allow configuration claimed by other exported packages
        #[arg(long)]
        allow_conflicts: bool,
        /// Mark all config as required
        #[arg(long)]
        require_all: bool,
        /// Generation method
        #[arg(long, value_enum, default_value = "write")]
        method: GenerationMethod,
        /// Output directory for generated packages
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
    /// Import configuration a package references but the site is missing
    ImportMissing {
        /// Package machine name
        package: String,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },
}

/// Assemble and export configuration packages
#[derive(Debug, Parser)]
#[command(name = "confpack", version, about)]
pub struct Cli {
    /// Workspace snapshot path (overrides the settings file)
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true, default_value = "confpack.toml")]
    pub settings: PathBuf,

    /// Log format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn dispatch(self) -> Result<()> {
        confpack_core::logging::init(self.log_format.map(|f| f.as_str()))?;

        let settings = Settings::load(&self.settings)?;
        let snapshot = self
            .snapshot
            .or_else(|| settings.snapshot.clone())
            .unwrap_or_else(|| PathBuf::from("site.json"));

        match self.command {
            Commands::Init {
                short_name,
                name,
                description,
                version,
                bundle,
            } => commands::init::execute(commands::init::InitArgs {
                snapshot,
                short_name,
                name,
                description,
                version,
                bundle,
            }),
            Commands::List {
                package,
                output_format,
            } => commands::list::execute(commands::list::ListArgs {
                snapshot,
                package,
                output_format,
            }),
            Commands::Reconcile {
                package,
                selections,
                allow_conflicts,
                output_format,
            } => commands::reconcile::execute(commands::reconcile::ReconcileArgs {
                snapshot,
                package,
                selections,
                allow_conflicts: allow_conflicts || settings.allow_conflicts,
                output_format,
            }),
            Commands::Export {
                package,
                selections,
                allow_conflicts,
                require_all,
                method,
                out_dir,
                output_format,
            } => commands::export::execute(commands::export::ExportArgs {
                snapshot,
                package,
                selections,
                allow_conflicts: allow_conflicts || settings.allow_conflicts,
                require_all,
                method,
                out_dir: out_dir
                    .or_else(|| settings.export_dir.clone())
                    .unwrap_or_else(|| PathBuf::from("export")),
                output_format,
            }),
            Commands::ImportMissing {
                package,
                output_format,
            } => commands::import_missing::execute(commands::import_missing::ImportMissingArgs {
                snapshot,
                package,
                output_format,
            }),
        }
    }
}
