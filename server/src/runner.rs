//! Drives one job from its first file to its terminal state.

use crate::analyzer::FileAnalyzer;
use crate::job::{JobId, JobRecord};
use crate::store::JobStore;
use extractor::ScratchDir;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Handle for a spawned job.
pub struct JobHandle {
    pub id: JobId,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Wait until the job is terminal and its scratch directory is gone.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!(job_id = %self.id, error = %e, "Job task did not finish cleanly");
        }
    }
}

/// Spawns one background task per job. Cheap to clone.
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    analyzer: Arc<dyn FileAnalyzer>,
    pacing: Duration,
    #[cfg(test)]
    pipeline_fault: bool,
}

impl JobRunner {
    pub fn new(store: JobStore, analyzer: Arc<dyn FileAnalyzer>) -> Self {
        Self {
            store,
            analyzer,
            pacing: Duration::ZERO,
            #[cfg(test)]
            pipeline_fault: false,
        }
    }

    /// Make the pipeline task itself panic before it touches any file.
    #[cfg(test)]
    fn with_pipeline_fault(mut self) -> Self {
        self.pipeline_fault = true;
        self
    }

    /// Delay between consecutive files, so frequent pollers can watch
    /// progress move. Zero disables it.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Start analyzing `files` for job `id`. The job must already be registered
    /// in the store. Ownership of `scratch` passes to the job, which deletes it
    /// on every terminal path.
    pub fn spawn(&self, id: JobId, scratch: ScratchDir, files: Vec<PathBuf>) -> JobHandle {
        let runner = self.clone();
        let task = tokio::spawn(async move { runner.run(id, scratch, files).await });
        JobHandle { id, task }
    }

    async fn run(self, id: JobId, scratch: ScratchDir, files: Vec<PathBuf>) {
        let start_time = Instant::now();

        // The pipeline runs in its own task so a panic anywhere inside it comes
        // back here as a JoinError instead of skipping the terminal transition.
        let work = process_files(
            self.store.clone(),
            Arc::clone(&self.analyzer),
            self.pacing,
            id,
            scratch.contents_dir(),
            files,
        );
        #[cfg(test)]
        let pipeline_fault = self.pipeline_fault;
        let pipeline = tokio::spawn(async move {
            #[cfg(test)]
            {
                if pipeline_fault {
                    panic!("pipeline fault for job {id}");
                }
            }
            work.await
        });

        if let Err(e) = pipeline.await {
            tracing::error!(job_id = %id, error = %e, "Job pipeline aborted unexpectedly");
            self.store
                .update(&id, |job| job.fail(format!("internal error: {e}")));
        }

        self.store.update(&id, JobRecord::finish);

        if let Err(e) = scratch.close() {
            tracing::warn!(job_id = %id, error = %e, "Failed to remove scratch directory");
        }

        if let Some(snapshot) = self.store.get(&id) {
            tracing::info!(
                job_id = %id,
                total = snapshot.total,
                processed = snapshot.processed,
                failed = snapshot.error.is_some(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Job finished"
            );
        }
    }
}

/// Analyze files in order, publishing one atomic update per file. Stops at
/// the first failure, keeping what was recorded before it.
async fn process_files(
    store: JobStore,
    analyzer: Arc<dyn FileAnalyzer>,
    pacing: Duration,
    id: JobId,
    root: PathBuf,
    files: Vec<PathBuf>,
) {
    let total = files.len();
    store.update(&id, |job| job.begin(total as u64));
    tracing::info!(job_id = %id, total, "Job started");

    for (index, path) in files.into_iter().enumerate() {
        let relative = relative_key(&root, &path);

        let analyzer = Arc::clone(&analyzer);
        let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&path)).await;

        match outcome {
            Ok(Ok(value)) => {
                tracing::debug!(job_id = %id, path = %relative, value, "Analyzed file");
                store.update(&id, |job| job.record(relative, value));
            }
            Ok(Err(e)) => {
                tracing::warn!(job_id = %id, path = %relative, error = %e, "File analysis failed");
                store.update(&id, |job| {
                    job.fail(format!("failed to process file {relative}: {e}"))
                });
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %id, path = %relative, error = %e, "Analyzer panicked");
                store.update(&id, |job| {
                    job.fail(format!("failed to process file {relative}: analyzer crashed"))
                });
                return;
            }
        }

        if index + 1 < total && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }
}

/// Result key for `path`: relative to the extraction root, `/`-separated on
/// every platform.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
