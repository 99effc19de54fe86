//! Init command: define a new package
//!
//! Creates an empty package definition in the workspace. The short name is
//! normalized and validated, the bundle prefix is applied, and names already
//! carried by an exported package or an installed module are refused.

use crate::commands::shared::{load_manager, save_manager};
use anyhow::Result;
use std::path::PathBuf;

pub struct InitArgs {
    pub snapshot: PathBuf,
    pub short_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub bundle: Option<String>,
}

pub fn execute(args: InitArgs) -> Result<()> {
    let mut manager = load_manager(&args.snapshot)?;
    let human_name = args.name.unwrap_or_else(|| args.short_name.clone());
    let mut package = manager
        .init_package(&args.short_name, &human_name, args.bundle.as_deref())?
        .clone();
    if let Some(description) = args.description {
        package.description = description;
    }
    package.version = args.version;
    let machine_name = package.machine_name.clone();
    manager.set_package(package);
    save_manager(&manager, &args.snapshot)?;

    println!("Initialized package {}", machine_name);
    Ok(())
}
