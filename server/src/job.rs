//! Job identity and the per-job progress record.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use ts_rs::TS;
use uuid::Uuid;

/// Opaque handle for one upload's background analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Mutable state of one job. Only the runner that owns the job mutates it,
/// always through [`crate::store::JobStore::update`].
#[derive(Debug, Default)]
pub struct JobRecord {
    total: u64,
    processed: u64,
    results: BTreeMap<String, u64>,
    completed: bool,
    error: Option<String>,
    finished_at: Option<Instant>,
}

impl JobRecord {
    /// Reset counters and fix the number of files the run will look at.
    pub fn begin(&mut self, total: u64) {
        *self = JobRecord {
            total,
            ..JobRecord::default()
        };
    }

    /// Record one analyzed file under its path relative to the extraction root.
    pub fn record(&mut self, relative_path: String, value: u64) {
        if self.processed >= self.total {
            tracing::warn!(
                path = %relative_path,
                total = self.total,
                "Ignoring result beyond the job's file count"
            );
            return;
        }
        self.results.insert(relative_path, value);
        self.processed += 1;
    }

    /// Mark the job failed. The first error wins.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    /// Terminal transition. Afterwards the store refuses further updates.
    pub fn finish(&mut self) {
        self.completed = true;
        self.finished_at = Some(Instant::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.completed
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            total: self.total,
            processed: self.processed,
            results: self.results.clone(),
            completed: self.completed,
            error: self.error.clone(),
        }
    }
}

/// Point-in-time copy of a job, as served by `GET /progress/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "../../web/src/bindings/")]
pub struct JobSnapshot {
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub processed: u64,
    #[ts(type = "Record<string, number>")]
    pub results: BTreeMap<String, u64>,
    pub completed: bool,
    pub error: Option<String>,
}
