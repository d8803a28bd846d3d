//! Migration Service
//!
//! Sweeps already-stored images through the optimizer after a preset's
//! budget changes.
//!
//! Records are processed strictly one at a time and a failed record never
//! stops the batch. Re-running is the recovery path: objects already near
//! their budget are skipped. There is no locking, so only one migration may
//! run against a bucket at a time.

use std::path::Path;
use std::sync::Arc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::{ImageRecord, PresetName, SourceImage};
use super::optimizer::{OptimizeError, OptimizerService};
use super::records::{RecordError, RecordStore};
use super::storage::{unique_object_path, ObjectStore, StorageError};

/// Objects at or below this share of the budget are left alone
pub const DEFAULT_SKIP_THRESHOLD_PERCENT: u32 = 120;

/// Per-record migration error
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Migration options
#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Classify records without writing anything
    pub dry_run: bool,
    /// Only records for this preset
    pub preset: Option<PresetName>,
    /// Stop after this many records
    pub limit: Option<usize>,
}

/// What happened to one record
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Optimized {
        old_size: u64,
        new_size: u64,
        new_path: String,
    },
    Skipped {
        size: u64,
    },
    /// Dry run only
    WouldOptimize {
        size: u64,
    },
    Failed {
        reason: String,
    },
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Optimized { .. } => "optimized",
            Self::Skipped { .. } => "skipped",
            Self::WouldOptimize { .. } => "pending",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome for one record
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub record_id: String,
    pub preset: PresetName,
    pub path: String,
    #[serde(flatten)]
    pub status: RecordStatus,
}

/// Migration summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub optimized: usize,
    pub skipped: usize,
    pub pending: usize,
    pub failed: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub outcomes: Vec<RecordOutcome>,
}

impl MigrationReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    fn push(&mut self, outcome: RecordOutcome) {
        match &outcome.status {
            RecordStatus::Optimized { old_size, new_size, .. } => {
                self.optimized += 1;
                self.bytes_before += old_size;
                self.bytes_after += new_size;
            }
            RecordStatus::Skipped { .. } => self.skipped += 1,
            RecordStatus::WouldOptimize { .. } => self.pending += 1,
            RecordStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Batch re-optimizer for stored images
pub struct MigrationDriver {
    storage: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    optimizer: OptimizerService,
    skip_threshold_percent: u32,
}

impl MigrationDriver {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        optimizer: OptimizerService,
    ) -> Self {
        Self {
            storage,
            records,
            optimizer,
            skip_threshold_percent: DEFAULT_SKIP_THRESHOLD_PERCENT,
        }
    }

    pub fn with_skip_threshold(mut self, percent: u32) -> Self {
        self.skip_threshold_percent = percent;
        self
    }

    /// Process every matching record in order.
    ///
    /// Only a failure to list records aborts the run.
    pub async fn run(&self, options: &MigrationOptions) -> Result<MigrationReport, RecordError> {
        let records = self.records.list().await?;
        let selected = records
            .into_iter()
            .filter(|r| options.preset.map_or(true, |p| r.preset == p))
            .take(options.limit.unwrap_or(usize::MAX));

        let mut report = MigrationReport::default();

        for record in selected {
            let status = match self.migrate_record(&record, options.dry_run).await {
                Ok(status) => status,
                Err(e) => {
                    error!(record = %record.id, path = %record.path, error = %e, "Migration failed");
                    RecordStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            report.push(RecordOutcome {
                record_id: record.id.clone(),
                preset: record.preset,
                path: record.path.clone(),
                status,
            });
        }

        info!(
            optimized = report.optimized,
            skipped = report.skipped,
            pending = report.pending,
            failed = report.failed,
            bytes_before = report.bytes_before,
            bytes_after = report.bytes_after,
            "Migration finished"
        );

        Ok(report)
    }

    async fn migrate_record(
        &self,
        record: &ImageRecord,
        dry_run: bool,
    ) -> Result<RecordStatus, MigrationError> {
        let preset = *self.optimizer.presets().get(record.preset);
        let data = self.storage.get(&record.path).await?;
        let old_size = data.len() as u64;

        if preset.is_within(old_size, self.skip_threshold_percent) {
            info!(record = %record.id, size = old_size, "Already within budget, skipping");
            return Ok(RecordStatus::Skipped { size: old_size });
        }

        if dry_run {
            return Ok(RecordStatus::WouldOptimize { size: old_size });
        }

        let filename = Path::new(&record.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let source = SourceImage::sniffed(data, filename);

        let optimized = self
            .optimizer
            .validate_and_optimize(source, record.preset)
            .await?;

        let dir = Path::new(&record.path)
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| record.preset.storage_dir());
        let new_path = unique_object_path(dir, optimized.format.extension());

        let stored = self
            .storage
            .put(&new_path, &optimized.data, optimized.mime_type)
            .await?;

        if let Err(e) = self
            .records
            .update_image(&record.id, &stored.path, &stored.url)
            .await
        {
            warn!(record = %record.id, orphan = %stored.path, "Record not updated; new object left behind");
            return Err(e.into());
        }

        if let Err(e) = self.storage.delete(&record.path).await {
            warn!(record = %record.id, path = %record.path, error = %e, "Failed to delete original");
        }

        info!(
            record = %record.id,
            old_path = %record.path,
            new_path = %stored.path,
            old_size,
            new_size = stored.size,
            attempts = optimized.attempts(),
            "Record migrated"
        );

        Ok(RecordStatus::Optimized {
            old_size,
            new_size: stored.size,
            new_path: stored.path,
        })
    }
}
