//! `symphovert convert` command implementation
//!
//! Converts every pending record of one archive.

use crate::catalog::Catalog;
use crate::conductor::{BatchConductor, BatchSummary};
use crate::config::Config;
use crate::desktop::SystemDesktop;
use crate::driver::SymphonyDriver;
use crate::error::{CliError, Result};
use crate::progress;
use crate::routing::{ArchiveLayout, FormatRouter, JobPlanner};
use colored::Colorize;
use std::path::Path;
use std::time::{Duration, Instant};

/// Convert the pending files of the archive at `archive`
pub fn run(archive: &Path, config_file: Option<&Path>, show_progress: bool) -> Result<BatchSummary> {
    if !archive.is_dir() {
        return Err(CliError::ArchiveNotFound(archive.to_path_buf()));
    }
    let root = std::path::absolute(archive)?;

    let config = Config::resolve(config_file)?;
    let router = FormatRouter::from_config(&config)?;

    let layout = ArchiveLayout::new(&root);
    let catalog = Catalog::open(layout.catalog_path())?;

    println!("{} Converting files in {}", "→".cyan(), root.display());

    let planner = JobPlanner::new(layout, router, config.tool_name.clone());
    let driver = SymphonyDriver::new(
        SystemDesktop::new(),
        config.application.clone(),
        config.timings.clone(),
    );

    let started = Instant::now();
    let summary = BatchConductor::new(&catalog, driver, planner)
        .with_policy(config.existing_artifact)
        .with_progress(progress::batch_progress(show_progress))
        .run_batch()?;

    print_summary(&summary, started.elapsed());
    Ok(summary)
}

fn print_summary(summary: &BatchSummary, elapsed: Duration) {
    println!();
    println!("{}", "Summary:".cyan().bold());
    println!("  Converted:         {}", summary.converted.to_string().green());
    if summary.errors > 0 {
        println!("  Failed:            {}", summary.errors.to_string().red().bold());
    } else {
        println!("  Failed:            {}", summary.errors);
    }
    println!("  Already converted: {}", summary.already_converted);
    println!("  Skipped:           {}", summary.skipped);
    println!("  Elapsed:           {}", progress::format_elapsed(elapsed));

    if summary.has_failures() {
        println!();
        println!(
            "{} {} file(s) failed. See the error events in the catalog for details.",
            "✗".red(),
            summary.errors
        );
    } else {
        println!();
        println!("{} Done", "✓".green().bold());
    }
}
