//! Symphovert CLI Library
//!
//! Converts the Lotus SmartSuite documents of a digital archive to
//! OpenDocument by remote-controlling IBM Symphony, and records the
//! converted master copies in the archive's catalog.
//!
//! # Overview
//!
//! - [`desktop`]: clipboard, keystroke and process primitives
//! - [`driver`]: the open / save-as / kill / verify protocol for one file
//! - [`routing`]: which records to convert, to what, and where
//! - [`catalog`]: the archive's SQLite catalog
//! - [`conductor`]: the batch loop tying them together

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod commands;
pub mod conductor;
pub mod config;
pub mod desktop;
pub mod driver;
pub mod error;
pub mod progress;
pub mod routing;

// Re-export commonly used types
pub use conductor::{BatchConductor, BatchSummary, ExistingArtifactPolicy};
pub use config::Config;
pub use driver::{ConversionOutcome, DocumentConverter, SymphonyDriver};
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Symphovert - convert Lotus SmartSuite files to OpenDocument with IBM Symphony
#[derive(Parser, Debug)]
#[command(name = "symphovert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the CLI reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert the pending files of an archive
    Convert {
        /// Archive root (contains OriginalDocuments, MasterDocuments and _metadata)
        archive: PathBuf,

        /// TOML configuration file
        #[arg(short, long, env = "SYMPHOVERT_CONFIG")]
        config: Option<PathBuf>,

        /// Do not show a progress bar
        #[arg(long)]
        no_progress: bool,
    },
}
