use std::fmt;
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Pipeline stage a failure belongs to. Surfaced in every user-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    RequestBuilding,
    Generation,
    Filling,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::RequestBuilding => "request-building",
            Stage::Generation => "generation",
            Stage::Filling => "filling",
            Stage::Writing => "naming/writing",
        };
        f.write_str(name)
    }
}

/// Domain error taxonomy shared by the CLI, the HTTP API and queued jobs.
///
/// Core components return these directly and never swallow them; retry and
/// reporting decisions belong to the caller.
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Placeholder '{placeholder}' not found in the template")]
    PlaceholderNotFound { placeholder: String },

    #[error("Generation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Generation service rate limited the request: {0}")]
    RateLimited(String),

    #[error("Generation service returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation did not complete within {seconds}s")]
    GenerationTimeout { seconds: u64 },

    #[error("File error at {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed template document: {0}")]
    Document(String),

    #[error("Job was cancelled")]
    Cancelled,
}

impl ResumeError {
    pub fn file_io(path: impl Into<PathBuf>, stage: Stage, source: std::io::Error) -> Self {
        ResumeError::FileIo {
            path: path.into(),
            stage,
            source,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ResumeError::InvalidInput(_) => Stage::RequestBuilding,
            ResumeError::ServiceUnavailable(_)
            | ResumeError::RateLimited(_)
            | ResumeError::InvalidResponse(_)
            | ResumeError::GenerationTimeout { .. }
            | ResumeError::Cancelled => Stage::Generation,
            ResumeError::PlaceholderNotFound { .. } | ResumeError::Document(_) => Stage::Filling,
            ResumeError::FileIo { stage, .. } => *stage,
        }
    }

    /// Machine-readable code, stable across the CLI, HTTP bodies and job records.
    pub fn code(&self) -> &'static str {
        match self {
            ResumeError::InvalidInput(_) => "INVALID_INPUT",
            ResumeError::PlaceholderNotFound { .. } => "PLACEHOLDER_NOT_FOUND",
            ResumeError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ResumeError::RateLimited(_) => "RATE_LIMITED",
            ResumeError::InvalidResponse(_) => "INVALID_RESPONSE",
            ResumeError::GenerationTimeout { .. } => "GENERATION_TIMEOUT",
            ResumeError::FileIo { .. } => "FILE_IO_ERROR",
            ResumeError::Document(_) => "DOCUMENT_ERROR",
            ResumeError::Cancelled => "CANCELLED",
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResumeError::InvalidInput(_) => 2,
            ResumeError::PlaceholderNotFound { .. } => 3,
            ResumeError::ServiceUnavailable(_) => 4,
            ResumeError::RateLimited(_) => 5,
            ResumeError::InvalidResponse(_) => 6,
            ResumeError::GenerationTimeout { .. } => 7,
            ResumeError::FileIo { .. } => 8,
            ResumeError::Document(_) => 9,
            ResumeError::Cancelled => 130,
        }
    }

    /// Whether the generation collaborator may succeed if called again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResumeError::ServiceUnavailable(_) | ResumeError::RateLimited(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            ResumeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ResumeError::PlaceholderNotFound { .. } | ResumeError::Document(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ResumeError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ResumeError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ResumeError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            ResumeError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ResumeError::FileIo {
                stage: Stage::Input,
                source,
                ..
            } if matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::InvalidData
            ) =>
            {
                StatusCode::BAD_REQUEST
            }
            ResumeError::FileIo { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ResumeError::Cancelled => StatusCode::CONFLICT,
        }
    }
}

/// Serializable error summary stored on job records.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub stage: String,
    pub message: String,
}

impl From<&ResumeError> for ErrorReport {
    fn from(err: &ResumeError) -> Self {
        ErrorReport {
            code: err.code().to_string(),
            stage: err.stage().to_string(),
            message: err.to_string(),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Resume(#[from] ResumeError),

    #[error("Job store error: {0}")]
    Store(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, stage, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", None, msg.clone()),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                Some(Stage::Input),
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", None, msg.clone()),
            AppError::Resume(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!("{} stage failed: {err}", err.stage());
                }
                (status, err.code(), Some(err.stage()), err.to_string())
            }
            AppError::Store(msg) => {
                tracing::error!("Job store error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    None,
                    "A job store error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    None,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "stage": stage.map(|s| s.to_string()),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_names_its_stage() {
        let io = ResumeError::file_io(
            "generated/out.docx",
            Stage::Writing,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io.stage(), Stage::Writing);
        assert_eq!(
            ResumeError::InvalidInput("empty".into()).stage(),
            Stage::RequestBuilding
        );
        assert_eq!(
            ResumeError::PlaceholderNotFound {
                placeholder: "<objective_here>".into()
            }
            .stage(),
            Stage::Filling
        );
        assert_eq!(
            ResumeError::GenerationTimeout { seconds: 30 }.stage(),
            Stage::Generation
        );
    }

    #[test]
    fn test_file_io_message_includes_path() {
        let err = ResumeError::file_io(
            "input/resume.md",
            Stage::Input,
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("input/resume.md"));
    }

    #[test]
    fn test_only_service_errors_are_transient() {
        assert!(ResumeError::ServiceUnavailable("503".into()).is_transient());
        assert!(ResumeError::RateLimited("429".into()).is_transient());
        assert!(!ResumeError::InvalidResponse("bad json".into()).is_transient());
        assert!(!ResumeError::GenerationTimeout { seconds: 1 }.is_transient());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            ResumeError::InvalidInput(String::new()),
            ResumeError::PlaceholderNotFound {
                placeholder: String::new(),
            },
            ResumeError::ServiceUnavailable(String::new()),
            ResumeError::RateLimited(String::new()),
            ResumeError::InvalidResponse(String::new()),
            ResumeError::GenerationTimeout { seconds: 0 },
            ResumeError::Document(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|&c| c != 0 && c != 1));
    }

    #[test]
    fn test_app_error_status_mapping() {
        let resp = AppError::from(ResumeError::RateLimited("slow down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = AppError::from(ResumeError::PlaceholderNotFound {
            placeholder: "<objective_here>".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = AppError::NotFound("job".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let unreadable = ResumeError::file_io(
            "input/resume.md",
            Stage::Input,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "not valid UTF-8 text"),
        );
        let resp = AppError::from(unreadable).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
