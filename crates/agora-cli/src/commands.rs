//! CLI command implementations.

use std::path::PathBuf;
use clap::{Parser, Subcommand};
use crate::config::CliConfig;
use crate::script::{self, Script, SimulationReport};
use crate::telemetry;

/// Main CLI.
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(about = "Agora - token-weighted DAO governance")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, value_name = "FILE", env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Network preset (hardhat, localhost, goerli)
    #[arg(short, long, global = true, env = "AGORA_NETWORK")]
    pub network: Option<String>,

    /// Log level
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved configuration as TOML
    Config,

    /// Run a simulation script
    Simulate {
        /// Script file
        #[arg(short, long, value_name = "FILE")]
        script: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Load the configuration file and apply command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<CliConfig> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    if let Some(network) = &cli.network {
        config.network = network.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Execute a parsed command line.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    match &config.logging.log_file {
        Some(path) => telemetry::init_telemetry_with_file(&config.logging.level, path)?,
        None => telemetry::init_telemetry(&config.logging.level, config.logging.format == "json")?,
    }

    tracing::info!("Network: {}", config.network);

    match cli.command {
        Commands::Config => execute_config(&config),
        Commands::Simulate { script, json } => execute_simulate(&config, &script, json),
    }
}

fn execute_config(config: &CliConfig) -> anyhow::Result<()> {
    let resolved = CliConfig {
        dao: Some(config.resolve_dao()?),
        ..config.clone()
    };
    print!("{}", toml::to_string_pretty(&resolved)?);
    Ok(())
}

fn execute_simulate(config: &CliConfig, path: &PathBuf, json: bool) -> anyhow::Result<()> {
    let script = Script::from_file(path)?;
    tracing::info!("Running {} steps from {}", script.steps.len(), path.display());

    let report = script::run(&script, config.resolve_dao()?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    for step in &report.steps {
        let status = if step.ok { "ok" } else { "rejected" };
        println!(
            "[{:>3}] t={:<8} {:<8} {:<9} {}",
            step.index, step.time, step.action, status, step.detail
        );
    }

    println!();
    println!("Final time:   {}", report.final_time);
    println!("Total staked: {}", report.total_staked.format_tokens());
    match report.stored_value {
        Some(value) => println!("Box value:    {}", value),
        None => println!("Box value:    (empty)"),
    }
    println!("Events:       {}", report.events.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "agora", "simulate", "--script", "demo.toml", "--network", "goerli", "--json",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("goerli"));
        match cli.command {
            Commands::Simulate { script, json } => {
                assert_eq!(script, PathBuf::from("demo.toml"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_network_override() {
        let cli = Cli::try_parse_from(["agora", "--network", "goerli", "config"]).unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.network, "goerli");
        assert_eq!(config.resolve_dao().unwrap().quorum_percentage, 50);
    }

    #[test]
    fn test_unknown_network_fails() {
        let cli = Cli::try_parse_from(["agora", "--network", "moon", "config"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
