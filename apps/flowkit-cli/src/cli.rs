// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use flowkit_engine::Engine;
use schemars::schema_for;
use tracing::{error, info, warn};

use crate::config;

type LogInitFn = fn(
    &config::LogConfig,
    &config::TelemetryConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the CLI's own configuration file (logging/telemetry)
    #[arg(short, long, default_value = "flowkit.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and run a graph document until it completes or Ctrl-C is pressed
    Run {
        /// Path to a YAML or JSON graph document
        graph: PathBuf,
    },
    /// Parse and structurally validate a graph document without running it
    Validate {
        /// Path to a YAML or JSON graph document
        graph: PathBuf,
    },
    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate a default config file and print it to stdout
    Default,
    /// Generate a JSON schema for the config and print it to stdout
    Schema,
}

fn read_graph_document(path: &Path) -> Result<flowkit_api::GraphDocument, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read graph document '{}': {e}", path.display()))?;
    let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
    let document = if is_json { flowkit_api::yaml::parse_json(&text)? } else { flowkit_api::yaml::parse_yaml(&text)? };
    Ok(document)
}

/// Handle the "run" command: build, start, and drive a graph until it
/// completes or the process receives Ctrl-C.
#[allow(clippy::disallowed_macros)]
async fn handle_run_command(graph_path: &Path) {
    let document = match read_graph_document(graph_path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Failed to load graph document: {e}");
            std::process::exit(1);
        },
    };

    let engine = Engine::new();
    let definition = match flowkit_api::yaml::compile(document, &engine.registry) {
        Ok(definition) => definition,
        Err(e) => {
            eprintln!("Failed to compile graph document: {e}");
            std::process::exit(1);
        },
    };

    let graph_name = definition.name.clone();
    let handle = match flowkit_engine::GraphRunner::initialize(definition).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize graph '{graph_name}': {e}");
            std::process::exit(1);
        },
    };

    if let Err(e) = handle.start().await {
        eprintln!("Failed to start graph '{graph_name}': {e}");
        std::process::exit(1);
    }

    info!(graph = %graph_name, "graph running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, stopping immediately");
    }

    if let Err(e) = handle.stop().await {
        error!(graph = %graph_name, error = %e, "error while stopping graph");
        std::process::exit(1);
    }
}

/// Handle the "validate" command: parse and structurally validate a graph
/// document without running it.
#[allow(clippy::disallowed_macros)]
fn handle_validate_command(graph_path: &Path) {
    let document = match read_graph_document(graph_path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Failed to load graph document: {e}");
            std::process::exit(1);
        },
    };

    let engine = Engine::new();
    match flowkit_api::yaml::compile(document, &engine.registry) {
        Ok(definition) => {
            println!(
                "OK: graph '{}' is valid ({} nodes, {} edges)",
                definition.name,
                definition.nodes.len(),
                definition.edges.len()
            );
        },
        Err(e) => {
            eprintln!("Invalid graph document: {e}");
            std::process::exit(1);
        },
    }
}

/// Handle the "config default" command - print default config to stdout
#[allow(clippy::disallowed_macros)]
fn handle_config_default_command() {
    match config::generate_default() {
        Ok(toml_string) => {
            println!("# Default flowkit configuration file");
            println!("{toml_string}");
        },
        Err(e) => {
            eprintln!("Failed to generate default config: {e}");
            std::process::exit(1);
        },
    }
}

/// Handle the "config schema" command - print JSON schema to stdout
#[allow(clippy::disallowed_macros)]
fn handle_config_schema_command() {
    let schema = schema_for!(config::Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to generate config schema: {e}");
            std::process::exit(1);
        },
    }
}

/// Handle CLI commands. `init_logging` is initialized before any subcommand
/// runs, using the CLI's own config file (logging/telemetry only).
#[allow(clippy::disallowed_macros)]
pub async fn handle_command(cli: &Cli, init_logging: LogInitFn) {
    // Config commands don't need logging initialized.
    if let Commands::Config(sub) = &cli.command {
        match sub {
            ConfigCommands::Default => handle_config_default_command(),
            ConfigCommands::Schema => handle_config_schema_command(),
        }
        return;
    }

    let config_result = match config::load(&cli.config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        },
    };

    let _log_guard = match init_logging(&config_result.config.log, &config_result.config.telemetry) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(1);
        },
    };

    if let Some(missing_file) = &config_result.file_missing {
        warn!(config_path = %missing_file, "Config file not found, using defaults");
    }

    match &cli.command {
        Commands::Run { graph } => handle_run_command(graph).await,
        Commands::Validate { graph } => handle_validate_command(graph),
        Commands::Config(_) => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_graph(contents: &str, extension: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(extension).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_yaml_graph_document() {
        let file = write_temp_graph(
            r"
name: example
nodes:
  src:
    kind: source::manual
  snk:
    kind: sink::log
    needs: src
",
            ".yaml",
        );
        let document = read_graph_document(file.path()).unwrap();
        assert_eq!(document.name, "example");
        assert_eq!(document.nodes.len(), 2);
    }

    #[test]
    fn reads_json_graph_document() {
        let file = write_temp_graph(
            r#"{"name": "example", "nodes": {"src": {"kind": "source::manual"}}}"#,
            ".json",
        );
        let document = read_graph_document(file.path()).unwrap();
        assert_eq!(document.name, "example");
    }

    #[test]
    fn missing_file_reports_an_error() {
        let result = read_graph_document(Path::new("/nonexistent/graph.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn validate_command_accepts_a_well_formed_graph() {
        let file = write_temp_graph(
            r"
name: example
nodes:
  src:
    kind: source::manual
  snk:
    kind: sink::log
    needs: src
",
            ".yaml",
        );
        let document = read_graph_document(file.path()).unwrap();
        let engine = Engine::new();
        let definition = flowkit_api::yaml::compile(document, &engine.registry).unwrap();
        assert_eq!(definition.nodes.len(), 2);
    }
}
