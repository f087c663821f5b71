// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rivet - plugin host for orchestration projects.
//!
//! This is the binary entry point: it loads the project configuration,
//! builds the plugin registry and dispatcher, and runs one command.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod plugins;
mod resolve;
mod secret;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rivet_config::RivetConfig;
use rivet_executor::ExecutionContext;

/// Rivet - plugin host for orchestration projects.
#[derive(Parser, Debug)]
#[command(name = "rivet", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect available plugins.
    Plugin {
        #[command(subcommand)]
        action: PluginCommands,
    },
    /// Create keys and encrypt or decrypt values with a secret plugin.
    Secret {
        /// Plugin to use. Defaults to the one configured under
        /// `[plugin_hooks]`, then `pkcs7`.
        #[arg(long, global = true)]
        plugin: Option<String>,

        #[command(subcommand)]
        action: SecretCommands,
    },
    /// Resolve every plugin reference in a JSON file and print the result.
    Resolve {
        file: PathBuf,
        /// Only validate references; print nothing on success.
        #[arg(long)]
        validate_only: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommands {
    /// List built-in and module plugins.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Show the hooks a plugin supports.
    Show { name: String },
}

#[derive(Subcommand, Debug)]
enum SecretCommands {
    /// Generate key material.
    Createkeys {
        /// Overwrite existing keys.
        #[arg(long)]
        force: bool,
    },
    /// Encrypt a value.
    Encrypt { text: String },
    /// Decrypt a value.
    Decrypt { text: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => rivet_config::load_and_validate_path(path),
        None => rivet_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            rivet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.project.log_level);
    tracing::debug!(boltdir = %config.project.boltdir.display(), "configuration loaded");

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: &RivetConfig) -> Result<(), rivet_core::RivetError> {
    let Some(command) = command else {
        println!("rivet: use --help for available commands");
        return Ok(());
    };

    // Configured plugins must all resolve before any command runs.
    let ctx = Arc::new(ExecutionContext::from_config(config));
    let mut dispatcher = rivet_plugin::dispatcher_from_config(config, ctx).await?;

    match command {
        Commands::Plugin { action } => match action {
            PluginCommands::List { json, plain } => plugins::run_list(config, json, plain).await,
            PluginCommands::Show { name } => plugins::run_show(&mut dispatcher, &name).await,
        },
        Commands::Secret { plugin, action } => {
            let op = match action {
                SecretCommands::Createkeys { force } => secret::SecretOp::Createkeys { force },
                SecretCommands::Encrypt { text } => secret::SecretOp::Encrypt(text),
                SecretCommands::Decrypt { text } => secret::SecretOp::Decrypt(text),
            };
            secret::run_secret(&mut dispatcher, config, plugin.as_deref(), op).await
        }
        Commands::Resolve { file, validate_only } => {
            resolve::run_resolve(&mut dispatcher, &file, validate_only).await
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rivet={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
