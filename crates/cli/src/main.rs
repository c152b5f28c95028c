//! Command-line launcher for the linecount server.
//!
//! Parses flags into a [`ServerConfig`] and serves until Ctrl-C.

use clap::Parser;
use extractor::MaterializeOptions;
use linecount_server::ServerConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "linecount")]
#[command(version, about = "Count lines in uploaded source archives", long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Parent directory for per-job scratch space [default: system temp dir]
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Delay between files within a job, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pacing_ms: u64,

    /// File extension to analyze (repeatable)
    #[arg(long = "extension", default_values_t = ["java".to_string()])]
    extensions: Vec<String>,

    /// Seconds a finished job stays pollable; 0 keeps jobs forever
    #[arg(long, default_value_t = 3600)]
    retention_secs: u64,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 256)]
    max_upload_mb: usize,

    /// Largest total size of expanded archive contents, in MiB
    #[arg(long, default_value_t = 1024)]
    max_expanded_mb: u64,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let extensions = self
            .extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();

        ServerConfig {
            host: self.host,
            port: self.port,
            scratch_root: self.scratch_dir.unwrap_or(defaults.scratch_root),
            pacing: Duration::from_millis(self.pacing_ms),
            materialize: MaterializeOptions {
                extensions,
                size_limit_bytes: Some(self.max_expanded_mb * 1024 * 1024),
            },
            retention: (self.retention_secs > 0).then(|| Duration::from_secs(self.retention_secs)),
            sweep_interval: defaults.sweep_interval,
            max_upload_bytes: self.max_upload_mb * 1024 * 1024,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    tracing::debug!(?config, "Starting");

    linecount_server::serve(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        Cli::try_parse_from(std::iter::once("linecount").chain(args.iter().copied()))
            .unwrap()
            .into_config()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.pacing, Duration::from_secs(1));
        assert_eq!(config.materialize.extensions, vec!["java"]);
        assert_eq!(config.retention, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_flags() {
        let config = parse(&[
            "--port",
            "9001",
            "--pacing-ms",
            "0",
            "--extension",
            ".kt",
            "--extension",
            "java",
            "--retention-secs",
            "0",
            "--max-upload-mb",
            "1",
        ]);
        assert_eq!(config.port, 9001);
        assert_eq!(config.pacing, Duration::ZERO);
        assert_eq!(config.materialize.extensions, vec!["kt", "java"]);
        assert_eq!(config.retention, None);
        assert_eq!(config.max_upload_bytes, 1024 * 1024);
    }
}
