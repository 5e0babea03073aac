//! Run accounting.
//!
//! [`Reporter`] is the single append-only accumulator for a run; it consumes
//! one [`RecordResult`] per target in input order and is turned into an
//! immutable [`RunReport`] at the end.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Transform,
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Transform => write!(f, "transform"),
            Stage::Persist => write!(f, "persist"),
        }
    }
}

/// Per-outcome totals.
///
/// `matched`, `fetched` and `transformed` count records that completed that
/// stage for all of their attachments. `persisted`, `skipped` and `failed`
/// are terminal and sum to the number of records processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub matched: usize,
    pub fetched: usize,
    pub transformed: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounts {
    #[must_use]
    pub fn terminal_total(&self) -> usize {
        self.persisted + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RecordOutcome {
    Persisted { asset_urls: Vec<String> },
    Skipped { reason: String },
    Failed { stage: Stage },
}

/// What happened to one target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub target_id: String,
    pub target_name: String,
    pub source_id: Option<String>,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
    /// SHA-256 of each artifact, in attachment order. Empty unless persisted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub asset_digests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub target_id: String,
    pub stage: Stage,
    pub message: String,
}

/// Final output of a run. Built by [`Reporter::finish`]; never mutated after.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    /// `true` when the run stopped early on cancellation.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Target records listed, including any not reached due to cancellation.
    pub total_targets: usize,
    pub counts: RunCounts,
    pub records: Vec<RecordReport>,
    pub errors: Vec<ErrorRecord>,
}

impl RunReport {
    #[must_use]
    pub fn record(&self, target_id: &str) -> Option<&RecordReport> {
        self.records.iter().find(|r| r.target_id == target_id)
    }

    pub fn errors_for<'a>(&'a self, target_id: &'a str) -> impl Iterator<Item = &'a ErrorRecord> {
        self.errors.iter().filter(move |e| e.target_id == target_id)
    }
}

/// Stages a record made it through before its terminal outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StageProgress {
    pub matched: bool,
    pub fetched: bool,
    pub transformed: bool,
}

/// Everything the pipeline learned about one record.
#[derive(Debug, Clone)]
pub(crate) struct RecordResult {
    pub report: RecordReport,
    pub progress: StageProgress,
    /// Present exactly when the outcome is `Failed`.
    pub error_message: Option<String>,
}

pub(crate) struct Reporter {
    dry_run: bool,
    started_at: DateTime<Utc>,
    total_targets: usize,
    counts: RunCounts,
    records: Vec<RecordReport>,
    errors: Vec<ErrorRecord>,
}

impl Reporter {
    pub(crate) fn new(dry_run: bool, total_targets: usize) -> Self {
        Self {
            dry_run,
            started_at: Utc::now(),
            total_targets,
            counts: RunCounts::default(),
            records: Vec::with_capacity(total_targets),
            errors: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, result: RecordResult) {
        let RecordResult {
            report,
            progress,
            error_message,
        } = result;

        if progress.matched {
            self.counts.matched += 1;
        }
        if progress.fetched {
            self.counts.fetched += 1;
        }
        if progress.transformed {
            self.counts.transformed += 1;
        }

        match &report.outcome {
            RecordOutcome::Persisted { .. } => self.counts.persisted += 1,
            RecordOutcome::Skipped { .. } => self.counts.skipped += 1,
            RecordOutcome::Failed { stage } => {
                self.counts.failed += 1;
                self.errors.push(ErrorRecord {
                    target_id: report.target_id.clone(),
                    stage: *stage,
                    message: error_message.unwrap_or_else(|| format!("{stage} failed")),
                });
            }
        }

        self.records.push(report);
    }

    pub(crate) fn finish(self, cancelled: bool) -> RunReport {
        RunReport {
            dry_run: self.dry_run,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_targets: self.total_targets,
            counts: self.counts,
            records: self.records,
            errors: self.errors,
        }
    }
}
