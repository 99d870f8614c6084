use filestore_core::MigrationError;
use serde::Serialize;

/// Outcome counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    /// Records enumerated.
    pub total: usize,
    /// Records fully processed (copied and recorded, or downloaded for download runs).
    pub migrated: usize,
    /// Records skipped because their upload never completed.
    pub skipped_incomplete: usize,
    /// Records skipped because their bytes were missing.
    pub skipped_missing: usize,
}

impl MigrationSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_incomplete + self.skipped_missing
    }

    pub(crate) fn log(&self, operation: &'static str) {
        tracing::info!(
            operation,
            total = self.total,
            migrated = self.migrated,
            skipped_incomplete = self.skipped_incomplete,
            skipped_missing = self.skipped_missing,
            "Run finished"
        );
    }

    pub(crate) fn log_aborted(&self, operation: &'static str, err: &MigrationError) {
        tracing::error!(
            operation,
            error = %err,
            total = self.total,
            migrated = self.migrated,
            skipped_incomplete = self.skipped_incomplete,
            skipped_missing = self.skipped_missing,
            remaining = self.total - self.migrated - self.skipped(),
            "Run aborted"
        );
    }
}
