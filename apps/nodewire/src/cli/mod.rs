//! # Nodewire CLI Module
//!
//! This module implements the CLI interface for nodewire.
//!
//! ## Available Commands
//!
//! - `status` - Show workflow metrics
//! - `suggest` - Rank slot pairs for linking two nodes
//! - `targets` - List inputs that could accept an output
//! - `connect` - Create a link, replacing an occupied input
//! - `disconnect` - Remove a link
//! - `batch` - Apply removals then additions from a JSON file, optionally
//!   detaching nodes first
//! - `detach` - Remove every link touching the given nodes
//! - `verify` - Check the workflow's link bookkeeping

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use nodewire_core::NodewireError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Nodewire - workflow graph link engine
///
/// Inspects and rewires the links of a node-based workflow saved as JSON.
#[derive(Parser, Debug)]
#[command(name = "nodewire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the workflow JSON file
    #[arg(short, long, global = true, default_value = "workflow.json")]
    pub workflow: PathBuf,

    /// Where to save a modified workflow (defaults to overwriting --workflow)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show workflow metrics
    Status,

    /// Rank the slot pairs that could link two nodes
    Suggest {
        /// Source node ID
        #[arg(short, long)]
        source: u64,

        /// Target node ID
        #[arg(short, long)]
        target: u64,
    },

    /// List every input that could accept a node's output
    Targets {
        /// Source node ID
        #[arg(short, long)]
        node: u64,

        /// Output slot index
        #[arg(short, long, default_value = "0")]
        slot: usize,
    },

    /// Link an output to an input
    Connect {
        /// Source node ID
        #[arg(long)]
        source: u64,

        /// Source output slot index
        #[arg(long, default_value = "0")]
        source_slot: usize,

        /// Target node ID
        #[arg(long)]
        target: u64,

        /// Target input slot index
        #[arg(long, default_value = "0")]
        target_slot: usize,

        /// Link even if the slot types are incompatible
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a link
    Disconnect {
        /// Link ID
        #[arg(short, long)]
        link: u64,
    },

    /// Apply a batch of removals and additions from a JSON file
    Batch {
        /// Path to the batch file
        #[arg(short, long)]
        file: PathBuf,

        /// Keep the workflow unchanged if any addition fails
        #[arg(long)]
        atomic: bool,

        /// Also remove every link touching these nodes (comma-separated)
        #[arg(long)]
        rewire: Option<String>,
    },

    /// Remove every link touching the given nodes
    Detach {
        /// Node IDs (comma-separated)
        #[arg(short, long)]
        nodes: String,
    },

    /// Check the workflow's link bookkeeping
    Verify,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), NodewireError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        tracing::info!("Config: {:?}", config);
    }

    let ctx = Context {
        workflow: cli.workflow,
        output: cli.output,
        json_mode: cli.json_mode,
        config,
    };

    match cli.command {
        Some(Commands::Status) | None => cmd_status(&ctx),
        Some(Commands::Suggest { source, target }) => cmd_suggest(&ctx, source, target),
        Some(Commands::Targets { node, slot }) => cmd_targets(&ctx, node, slot),
        Some(Commands::Connect {
            source,
            source_slot,
            target,
            target_slot,
            force,
        }) => cmd_connect(&ctx, source, source_slot, target, target_slot, force),
        Some(Commands::Disconnect { link }) => cmd_disconnect(&ctx, link),
        Some(Commands::Batch {
            file,
            atomic,
            rewire,
        }) => cmd_batch(&ctx, &file, atomic, rewire.as_deref()),
        Some(Commands::Detach { nodes }) => cmd_detach(&ctx, &nodes),
        Some(Commands::Verify) => cmd_verify(&ctx),
    }
}
