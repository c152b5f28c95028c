//! Concurrent registry of job records.

use crate::job::{JobId, JobRecord, JobSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared job registry. Cloning yields another handle to the same map.
///
/// Every [`update`](JobStore::update) runs under the write lock and every
/// [`get`](JobStore::get) copies the record under the read lock, so a reader
/// sees either all of a mutation or none of it.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty placeholder under a fresh ID.
    pub fn create(&self) -> JobId {
        let mut jobs = self.jobs.write();
        let mut id = JobId::new();
        while jobs.contains_key(&id) {
            id = JobId::new();
        }
        jobs.insert(id, JobRecord::default());
        id
    }

    pub fn get(&self, id: &JobId) -> Option<JobSnapshot> {
        self.jobs.read().get(id).map(JobRecord::snapshot)
    }

    /// Apply `mutate` to the job atomically with respect to readers.
    ///
    /// Returns `false` when the ID is unknown (never created or evicted) or the
    /// job is already terminal; terminal records are never touched again.
    pub fn update<F>(&self, id: &JobId, mutate: F) -> bool
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(id) {
            Some(job) if job.is_terminal() => {
                tracing::warn!(job_id = %id, "Refusing to update a terminal job");
                false
            }
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Drop terminal jobs that finished at least `retention` ago.
    /// Jobs still running are never evicted.
    pub fn evict_expired(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at()
                .map_or(true, |finished| now.duration_since(finished) < retention)
        });
        before - jobs.len()
    }

    /// Run [`evict_expired`](JobStore::evict_expired) every `interval` until
    /// the returned task is aborted or the runtime shuts down.
    pub fn spawn_sweeper(&self, retention: Duration, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_expired(retention);
                if evicted > 0 {
                    tracing::info!(
                        evicted,
                        remaining = store.len(),
                        retention_secs = retention.as_secs(),
                        "Evicted expired jobs"
                    );
                }
            }
        })
    }
}
