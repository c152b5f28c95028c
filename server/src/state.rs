use crate::analyzer::{FileAnalyzer, LineCounter};
use crate::config::ServerConfig;
use crate::runner::JobRunner;
use crate::store::JobStore;
use extractor::{MaterializeOptions, ScratchArea};
use std::io;
use std::sync::Arc;

/// Shared state handed to every request handler
pub struct AppState {
    /// Registry of all jobs, polled by `GET /progress`
    pub store: JobStore,
    /// Launches one background task per accepted upload
    pub runner: JobRunner,
    /// Where uploads are written and expanded
    pub scratch: ScratchArea,
    pub materialize: Arc<MaterializeOptions>,
}

impl AppState {
    /// State with the default line-counting analyzer.
    pub fn new(config: &ServerConfig) -> io::Result<Self> {
        Self::with_analyzer(config, Arc::new(LineCounter))
    }

    pub fn with_analyzer(config: &ServerConfig, analyzer: Arc<dyn FileAnalyzer>) -> io::Result<Self> {
        let store = JobStore::new();
        let runner = JobRunner::new(store.clone(), analyzer).with_pacing(config.pacing);
        Ok(Self {
            store,
            runner,
            scratch: ScratchArea::new(&config.scratch_root)?,
            materialize: Arc::new(config.materialize.clone()),
        })
    }
}
