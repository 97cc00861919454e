//! Agora CLI - Command-line driver for the Agora governance engine.
//!
//! Prints resolved DAO configurations and runs scripted governance
//! simulations against an in-memory DAO.

pub mod commands;
pub mod config;
pub mod executor;
pub mod script;
pub mod telemetry;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = commands::Cli::parse();

    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
