//! Per-job counters returned to the caller.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: String,
    pub created: usize,
    pub updated: usize,
    pub discontinued: usize,
    /// Products that gained affiliate data or a copied image.
    pub enriched: usize,
    /// Records dropped after an adapter, linkage, or store error.
    pub skipped: usize,
    /// Record-level problems logged during the run, including `skipped`.
    pub warnings: usize,
}

impl JobReport {
    #[must_use]
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    pub(crate) fn warn(&mut self) {
        self.warnings += 1;
    }

    pub(crate) fn skip(&mut self) {
        self.skipped += 1;
        self.warnings += 1;
    }

    pub(crate) fn log_completion(&self) {
        if self.has_warnings() {
            tracing::warn!(
                job = %self.job,
                created = self.created,
                updated = self.updated,
                discontinued = self.discontinued,
                enriched = self.enriched,
                skipped = self.skipped,
                warnings = self.warnings,
                "job completed with warnings"
            );
        } else {
            tracing::info!(
                job = %self.job,
                created = self.created,
                updated = self.updated,
                discontinued = self.discontinued,
                enriched = self.enriched,
                "job completed"
            );
        }
    }
}
