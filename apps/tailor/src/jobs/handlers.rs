//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::errors::{AppError, ResumeError, Stage};
use crate::generation::handlers::validate_request;
use crate::jobs::store::{JobRecord, JobStatus};
use crate::pipeline::GenerateInput;
use crate::state::AppState;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// POST /api/v1/jobs
pub async fn handle_enqueue(
    State(state): State<AppState>,
    Json(request): Json<GenerateInput>,
) -> Result<(StatusCode, Json<JobRecord>), AppError> {
    validate_request(&request)?;
    let record = state.jobs.enqueue(request).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRecord>, AppError> {
    Ok(Json(state.jobs.status(id).await?))
}

/// POST /api/v1/jobs/:id/cancel
pub async fn handle_cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRecord>, AppError> {
    Ok(Json(state.jobs.cancel(id).await?))
}

/// GET /api/v1/jobs/:id/artifact
///
/// Streams the produced file back as an attachment once the job succeeded.
pub async fn handle_download_artifact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = state.jobs.status(id).await?;
    let artifact = match (record.status, record.result) {
        (JobStatus::Succeeded, Some(artifact)) => artifact,
        (status, _) => {
            return Err(AppError::Conflict(format!(
                "job {id} has no artifact (status {status:?})"
            )))
        }
    };

    let bytes = tokio::fs::read(&artifact.path)
        .await
        .map_err(|e| ResumeError::file_io(&artifact.path, Stage::Writing, e))?;

    let content_type = if artifact.file_name.ends_with(".docx") {
        DOCX_CONTENT_TYPE
    } else {
        "text/plain; charset=utf-8"
    };
    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
