pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers::handle_generate;
use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Synchronous generation
        .route("/api/v1/generate", post(handle_generate))
        // Jobs API
        .route("/api/v1/jobs", post(handlers::handle_enqueue))
        .route("/api/v1/jobs/:id", get(handlers::handle_get_job))
        .route("/api/v1/jobs/:id/cancel", post(handlers::handle_cancel_job))
        .route(
            "/api/v1/jobs/:id/artifact",
            get(handlers::handle_download_artifact),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::errors::ResumeError;
    use crate::jobs::queue::JobQueue;
    use crate::jobs::store::InMemoryJobStore;
    use crate::pipeline::tests::{fixed_clock, test_config, StubGenerator};
    use crate::pipeline::Pipeline;

    fn app(generator: StubGenerator, dir: &std::path::Path) -> Router {
        let config = Arc::new(test_config(dir));
        let pipeline = Pipeline::new(Arc::new(generator), config).with_clock(fixed_clock);
        let jobs = JobQueue::start(pipeline.clone(), Arc::new(InMemoryJobStore::new()), 1);
        build_router(AppState { pipeline, jobs })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(StubGenerator::ok("x"), dir.path())
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_generate_returns_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(
            StubGenerator::ok("Results-driven backend engineer seeking a role at Acme."),
            dir.path(),
        )
        .oneshot(post_json(
            "/api/v1/generate",
            json!({"job_description": "Backend Engineer at Acme", "tone": "enthusiastic"}),
        ))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["file_name"], "backend-engineer_acme.docx");
        assert_eq!(body["cover_letter"], Value::Null);
        assert_eq!(
            body["passage"],
            "Results-driven backend engineer seeking a role at Acme."
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_job_description() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(StubGenerator::ok("x"), dir.path())
            .oneshot(post_json("/api/v1/generate", json!({"job_description": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_generation_errors_map_to_status_and_stage() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(
            StubGenerator::failing(|| ResumeError::ServiceUnavailable("down".into())),
            dir.path(),
        )
        .oneshot(post_json(
            "/api/v1/generate",
            json!({"job_description": "Engineer at Acme"}),
        ))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
        assert_eq!(body["error"]["stage"], "generation");
    }

    #[tokio::test]
    async fn test_job_lifecycle_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(StubGenerator::ok("Backend engineer."), dir.path());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/jobs",
                json!({"job_description": "Backend Engineer at Acme"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let mut status = Value::Null;
        for _ in 0..200 {
            let response = app
                .clone()
                .oneshot(get(&format!("/api/v1/jobs/{id}")))
                .await
                .unwrap();
            status = body_json(response).await;
            if status["status"] == "succeeded" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status["status"], "succeeded");
        assert_eq!(status["result"]["file_name"], "backend-engineer_acme.docx");

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/jobs/{id}/artifact")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"backend-engineer_acme.docx\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"PK"));

        let response = app
            .oneshot(post_json(&format!("/api/v1/jobs/{id}/cancel"), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(StubGenerator::ok("x"), dir.path())
            .oneshot(get(&format!("/api/v1/jobs/{}", uuid::Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
