use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod settings;

fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    // Dispatch to CLI handler
    parsed.dispatch()
}
