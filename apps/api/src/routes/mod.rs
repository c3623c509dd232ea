pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::storage::handlers as storage;
use crate::tailoring::handlers as tailoring;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::api_health_handler))
        // Tailoring
        .route("/api/generate", post(tailoring::handle_generate))
        .route(
            "/api/generate/stream",
            post(tailoring::handle_generate_stream),
        )
        .route("/api/evaluate", post(tailoring::handle_evaluate))
        .route("/api/factuality", post(tailoring::handle_factuality))
        // Profiles, jobs and stored resumes
        .route(
            "/api/resume/:username/:job_id",
            get(storage::handle_get_resume),
        )
        .route("/api/user/upload", post(storage::handle_upload_profile))
        .route("/api/job/create", post(storage::handle_create_job))
        .route("/api/jobs", get(storage::handle_list_jobs))
        .route("/api/resumes/:username", get(storage::handle_list_resumes))
        .with_state(state)
}
