//! Batch conductor
//!
//! Walks the pending catalog records one at a time, converts the ones this
//! tool owns, and commits each file's result before moving on. A restarted
//! run picks up where the last one stopped through the `processed` flag and
//! the master-copy lookup.

use crate::catalog::{Catalog, CatalogEvent, FileRecord, MasterArtifact, PendingFilter};
use crate::driver::{ConversionOutcome, DocumentConverter};
use crate::error::Result;
use crate::routing::JobPlanner;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// What to do with a record whose master copy is already catalogued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingArtifactPolicy {
    /// Leave the record as it is
    #[default]
    Skip,
    /// Flag the record processed without converting it again
    MarkProcessed,
}

/// Counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub converted: usize,
    pub errors: usize,
    /// Not this tool's, not routable, or already processed
    pub skipped: usize,
    /// Master copy already catalogued
    pub already_converted: usize,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.errors > 0
    }
}

/// Runs one conversion batch against a catalog
pub struct BatchConductor<'a, C: DocumentConverter> {
    catalog: &'a Catalog,
    converter: C,
    planner: JobPlanner,
    policy: ExistingArtifactPolicy,
    progress: ProgressBar,
}

impl<'a, C: DocumentConverter> BatchConductor<'a, C> {
    pub fn new(catalog: &'a Catalog, converter: C, planner: JobPlanner) -> Self {
        Self {
            catalog,
            converter,
            planner,
            policy: ExistingArtifactPolicy::default(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_policy(mut self, policy: ExistingArtifactPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Convert every pending record
    ///
    /// Per-file failures are counted. A catalog error rolls back the current
    /// file's writes and ends the run.
    pub fn run_batch(&mut self) -> Result<BatchSummary> {
        let result = self.run_records();
        if result.is_err() {
            if let Err(e) = self.catalog.rollback() {
                warn!(error = %e, "rollback failed");
            }
            self.progress.abandon();
        }
        result
    }

    fn run_records(&mut self) -> Result<BatchSummary> {
        self.catalog.log_event(
            &self
                .event("start")
                .with_data(json!({ "version": env!("CARGO_PKG_VERSION") })),
        )?;
        self.catalog.commit()?;

        let records = self.catalog.select_pending(&PendingFilter::convert())?;
        info!(pending = records.len(), "starting batch");
        self.progress.set_length(records.len() as u64);

        let mut summary = BatchSummary::default();
        for record in &records {
            self.progress.set_message(record.name().to_string());
            self.process(record, &mut summary)?;
            self.progress.inc(1);
        }
        self.progress.finish_and_clear();

        self.catalog
            .log_event(&self.event("end").with_data(json!(summary)))?;
        self.catalog.commit()?;

        info!(
            converted = summary.converted,
            errors = summary.errors,
            skipped = summary.skipped,
            already_converted = summary.already_converted,
            "batch finished"
        );
        Ok(summary)
    }

    fn process(&mut self, record: &FileRecord, summary: &mut BatchSummary) -> Result<()> {
        let job = match self.planner.plan(record) {
            Ok(job) => job,
            Err(reason) => {
                debug!(uuid = %record.uuid, name = record.name(), reason = %reason, "skipped");
                summary.skipped += 1;
                return Ok(());
            }
        };

        info!(uuid = %record.uuid, name = record.name(), output = %job.target_format, "convert");
        self.catalog.log_event(
            &self
                .event("convert")
                .with_uuid(record.uuid)
                .with_data(json!({ "name": record.name(), "output": job.target_format })),
        )?;

        if let Some(existing) = self
            .catalog
            .find_master_artifact_by_path(&job.master_relative_path)?
        {
            info!(uuid = %existing.uuid, name = existing.name(), "exists");
            self.catalog.log_event(
                &self
                    .event("exists")
                    .with_uuid(existing.uuid)
                    .with_data(json!({ "name": existing.name(), "original_uuid": record.uuid })),
            )?;

            if self.policy == ExistingArtifactPolicy::MarkProcessed {
                let mut updated = record.clone();
                updated.processed = true;
                self.catalog.update_file_record(&updated)?;
            }

            self.catalog.commit()?;
            summary.already_converted += 1;
            return Ok(());
        }

        match self
            .converter
            .convert(&job.source_path, &job.destination_path)
        {
            ConversionOutcome::Success { destination } => {
                let artifact =
                    match MasterArtifact::from_file(&destination, &job.archive_root, record.uuid, 0) {
                        Ok(artifact) => artifact,
                        Err(e) => return self.fail(record, &e.to_string(), summary),
                    };

                self.catalog.insert_master_artifact(&artifact)?;
                let mut updated = record.clone();
                updated.processed = true;
                self.catalog.update_file_record(&updated)?;

                info!(uuid = %artifact.uuid, name = artifact.name(), "output");
                self.catalog.log_event(
                    &self
                        .event("output")
                        .with_uuid(artifact.uuid)
                        .with_data(json!({
                            "name": artifact.name(),
                            "original_uuid": record.uuid,
                            "relative_path": artifact.relative_path,
                        })),
                )?;

                self.catalog.commit()?;
                summary.converted += 1;
                Ok(())
            }
            ConversionOutcome::Failure { reason } => self.fail(record, &reason, summary),
        }
    }

    fn fail(&self, record: &FileRecord, reason: &str, summary: &mut BatchSummary) -> Result<()> {
        error!(uuid = %record.uuid, name = record.name(), reason, "error");
        self.catalog.log_event(
            &self
                .event("error")
                .with_uuid(record.uuid)
                .with_data(json!({ "name": record.name() }))
                .with_reason(reason),
        )?;
        self.catalog.commit()?;
        summary.errors += 1;
        Ok(())
    }

    fn event(&self, step: &str) -> CatalogEvent {
        CatalogEvent::new(format!("{}.{}", self.planner.tool_name(), step))
    }
}
