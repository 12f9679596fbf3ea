//! Symphovert CLI - Main entry point

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use symphovert_cli::routing::METADATA_DIR;
use symphovert_cli::{Cli, Commands};
use symphovert_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use tracing::error;

fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return ExitCode::SUCCESS;
    }

    // Ensure a command is provided
    let Some(command) = cli.command.as_ref() else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        return ExitCode::from(2);
    };

    // Logging is optional; the CLI works without it
    let log_config = log_config(cli.verbose, command);
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        }
    };

    match execute_command(command) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Console gets warnings (debug when verbose); the archive's `_metadata`
/// directory, when present, gets an info-level log file.
fn log_config(verbose: bool, command: &Commands) -> LogConfig {
    let console_level = if verbose { LogLevel::Debug } else { LogLevel::Warn };

    let metadata_dir = match command {
        Commands::Convert { archive, .. } => archive.join(METADATA_DIR),
    };

    let builder = LogConfig::builder().log_file_prefix("symphovert");
    let config = if metadata_dir.is_dir() {
        builder
            .level(if verbose { LogLevel::Debug } else { LogLevel::Info })
            .console_level(console_level)
            .output(LogOutput::Both)
            .log_dir(metadata_dir)
            .build()
    } else {
        builder
            .level(console_level)
            .output(LogOutput::Console)
            .build()
    };

    // Environment variables take precedence
    config.clone().merge_env().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring LOG_* environment settings: {:#}", e);
        config
    })
}

/// Execute the CLI command
fn execute_command(command: &Commands) -> symphovert_cli::Result<ExitCode> {
    match command {
        Commands::Convert {
            archive,
            config,
            no_progress,
        } => {
            let summary =
                symphovert_cli::commands::convert::run(archive, config.as_deref(), !no_progress)?;

            if summary.has_failures() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
