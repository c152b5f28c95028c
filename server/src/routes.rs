//! HTTP handlers.
//!
//! - POST /upload: accept an archive, start a job, return its ID
//! - GET /progress/{task_id}: current snapshot of a job
//! - GET /health: liveness probe

use crate::error::ApiError;
use crate::job::{JobId, JobSnapshot};
use crate::state::AppState;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use extractor::ScratchDir;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use ts_rs::TS;

/// Multipart field carrying the archive
const UPLOAD_FIELD: &str = "file";

/// Response to a successful upload
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../../web/src/bindings/")]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct UploadResponse {
    pub task_id: String,
}

/// POST /upload: store the archive, expand it, and start analysis.
///
/// Only returns once the archive is known to be valid and non-empty, so a
/// bad upload never produces a task ID. Analysis itself runs in the
/// background.
async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::MissingUpload(e.body_text()))?;

    let scratch = state.scratch.allocate()?;
    receive_archive(&mut multipart, &scratch).await?;

    let archive_path = scratch.archive_path();
    let contents_dir = scratch.contents_dir();
    let options = Arc::clone(&state.materialize);
    let archive = tokio::task::spawn_blocking(move || {
        extractor::materialize(&archive_path, &contents_dir, &options)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Task join error: {e}")))??;

    let id = state.store.create();
    tracing::info!(
        job_id = %id,
        format = %archive.format,
        files = archive.files.len(),
        skipped_entries = archive.skipped_entries,
        "Accepted upload"
    );

    // The job outlives this request; dropping the handle detaches it.
    let _ = state.runner.spawn(id, scratch, archive.files);

    Ok(Json(UploadResponse {
        task_id: id.to_string(),
    }))
}

/// Stream the `file` part of the form into the scratch directory.
async fn receive_archive(multipart: &mut Multipart, scratch: &ScratchDir) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = write_field(field, scratch).await?;
        tracing::debug!(bytes, path = %scratch.archive_path().display(), "Stored upload");
        return Ok(());
    }

    Err(ApiError::MissingUpload(format!(
        "no `{UPLOAD_FIELD}` part in form"
    )))
}

async fn write_field(mut field: Field<'_>, scratch: &ScratchDir) -> Result<u64, ApiError> {
    let mut output = tokio::fs::File::create(scratch.archive_path()).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        output.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    output.flush().await?;
    Ok(written)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::ArchiveTooLarge(err.body_text())
    } else {
        ApiError::MissingUpload(err.body_text())
    }
}

/// GET /progress/{task_id}
async fn progress(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let id: JobId = task_id
        .parse()
        .map_err(|_| ApiError::TaskNotFound(task_id.clone()))?;

    state
        .store
        .get(&id)
        .map(Json)
        .ok_or(ApiError::TaskNotFound(task_id))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload))
        .route("/progress/{task_id}", get(progress))
        .route("/health", get(health))
}
