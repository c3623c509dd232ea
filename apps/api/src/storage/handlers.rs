//! Axum route handlers for profiles, jobs and stored resumes.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::models::job::{JobPosting, JobSummary};
use crate::models::resume::{ResumeSummary, StoredResume};
use crate::models::user::UserProfile;
use crate::state::AppState;

const PROFILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub job_id: String,
    pub company: String,
    pub role: String,
    pub jd_text: String,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub success: bool,
    pub job_id: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub username: String,
    pub resumes: Vec<ResumeSummary>,
}

/// POST /api/user/upload?username=
///
/// Stores the JSON profile sent as multipart field `file`.
pub async fn handle_upload_profile(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some(PROFILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid file: {e}")))?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload
        .ok_or_else(|| AppError::Validation(format!("Missing multipart field '{PROFILE_FIELD}'")))?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|_| AppError::Validation("Invalid JSON file".to_string()))?;
    let profile = UserProfile::from_value(value)
        .ok_or_else(|| AppError::Validation("Profile must be a JSON object".to_string()))?;

    let path = state.store.save_profile(&query.username, &profile).await?;
    info!("Uploaded profile for {}", query.username);

    Ok(Json(UploadResponse {
        success: true,
        message: "Profile uploaded successfully".to_string(),
        username: query.username,
        path: path.display().to_string(),
    }))
}

/// POST /api/job/create
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<Json<CreateJobResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let job = JobPosting {
        company: request.company,
        role: request.role,
        jd_text: request.jd_text,
    };
    let path = state.store.save_job(&request.job_id, &job).await?;

    Ok(Json(CreateJobResponse {
        success: true,
        job_id: request.job_id,
        path: path.display().to_string(),
    }))
}

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, AppError> {
    let jobs = state.store.list_jobs().await?;
    Ok(Json(JobListResponse { jobs }))
}

/// GET /api/resume/:username/:job_id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path((username, job_id)): Path<(String, String)>,
) -> Result<Json<StoredResume>, AppError> {
    let stored = state.store.get_resume(&username, &job_id).await?;
    Ok(Json(stored))
}

/// GET /api/resumes/:username
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let resumes = state.store.list_resumes(&username).await?;
    Ok(Json(ResumeListResponse { username, resumes }))
}
