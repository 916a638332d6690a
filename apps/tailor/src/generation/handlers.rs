//! Axum route handler for synchronous generation.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::output::Artifact;
use crate::pipeline::GenerateInput;
use crate::state::AppState;

/// POST /api/v1/generate
///
/// Runs the whole pipeline inside the request and returns the written artifact.
/// Long-running callers should prefer `POST /api/v1/jobs`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateInput>,
) -> Result<Json<Artifact>, AppError> {
    validate_request(&request)?;
    let artifact = state.pipeline.run(request).await?;
    Ok(Json(artifact))
}

/// Rejects requests that cannot succeed before any work is done.
pub fn validate_request(request: &GenerateInput) -> Result<(), AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    if request
        .resume
        .as_deref()
        .is_some_and(|r| r.trim().is_empty())
        && request.resume_path.is_none()
    {
        return Err(AppError::Validation(
            "resume cannot be empty; omit it to use the configured resume".to_string(),
        ));
    }
    Ok(())
}
