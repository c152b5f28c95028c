//! Runtime configuration for the server.

use extractor::MaterializeOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the server needs to start. The binary fills this from
/// command-line arguments; tests build it directly.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Parent directory for per-job scratch directories
    pub scratch_root: PathBuf,

    /// Delay between files within one job
    pub pacing: Duration,

    /// Archive expansion settings (recognized extensions, size limit)
    pub materialize: MaterializeOptions,

    /// How long terminal jobs stay pollable; `None` keeps them forever
    pub retention: Option<Duration>,

    /// How often the eviction sweeper runs when retention is set
    pub sweep_interval: Duration,

    /// Maximum accepted request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            scratch_root: std::env::temp_dir().join("linecount"),
            pacing: Duration::from_secs(1),
            materialize: MaterializeOptions::default(),
            retention: Some(Duration::from_secs(60 * 60)),
            sweep_interval: Duration::from_secs(60),
            max_upload_bytes: 256 * 1024 * 1024, // 256 MiB
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
