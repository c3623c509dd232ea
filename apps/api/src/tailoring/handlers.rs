//! Axum route handlers for the Tailoring API.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::TailoredResume;
use crate::state::AppState;
use crate::tailoring::evaluator::{EvaluationReport, Evaluator};
use crate::tailoring::factuality::{FactualityChecker, FactualityReport};
use crate::tailoring::pipeline::{TailorRequest, TailoringPipeline};
use crate::tailoring::progress::{ProgressEvent, ProgressReporter};

/// Events buffered between the pipeline task and a slow SSE client.
const PROGRESS_BUFFER: usize = 32;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub username: Option<String>,
    pub jd_text: String,
    pub company: String,
    pub role: String,
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

fn default_optimize() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub evaluation: f64,
    pub factuality: f64,
}

#[derive(Debug, Serialize)]
pub struct PathSummary {
    pub json: String,
    pub docx: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub resume: TailoredResume,
    pub scores: Option<ScoreSummary>,
    pub paths: Option<PathSummary>,
}

#[derive(Debug, Deserialize)]
pub struct StoredResumeRequest {
    pub username: Option<String>,
    pub job_id: String,
}

fn tailor_request(state: &AppState, body: GenerateRequest) -> Result<TailorRequest, AppError> {
    for (field, value) in [
        ("jd_text", &body.jd_text),
        ("company", &body.company),
        ("role", &body.role),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} cannot be empty")));
        }
    }
    Ok(TailorRequest {
        username: state.config.username_or_default(body.username.as_deref()),
        jd_text: body.jd_text,
        company: body.company,
        role: body.role,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate
///
/// With `optimize` (the default) runs the full pipeline and returns final
/// scores and output paths; otherwise returns the first draft only.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let optimize = body.optimize;
    let request = tailor_request(&state, body)?;
    let pipeline = TailoringPipeline::from_state(&state);

    if !optimize {
        let resume = pipeline.generate_only(&request).await?;
        return Ok(Json(GenerateResponse {
            success: true,
            resume,
            scores: None,
            paths: None,
        }));
    }

    let outcome = pipeline.run(&request, &ProgressReporter::silent()).await?;
    Ok(Json(GenerateResponse {
        success: true,
        scores: Some(ScoreSummary {
            evaluation: outcome.scores.evaluation.total_score,
            factuality: outcome.scores.factuality.factuality_score,
        }),
        paths: Some(PathSummary {
            json: outcome.paths.json_path,
            docx: outcome.paths.docx_path,
        }),
        resume: outcome.resume,
    }))
}

/// POST /api/generate/stream
///
/// Runs the full pipeline on a background task and streams every progress
/// event as one SSE `data:` frame. The run finishes even if the client leaves.
pub async fn handle_generate_stream(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = tailor_request(&state, body)?;
    let pipeline = TailoringPipeline::from_state(&state);
    let (tx, rx) = mpsc::channel::<ProgressEvent>(PROGRESS_BUFFER);

    info!(
        "Streaming tailoring run for {} ({} at {})",
        request.username, request.role, request.company
    );
    tokio::spawn(async move {
        // Failures are already reported on the stream and logged.
        let _ = pipeline
            .run_reported(&request, &ProgressReporter::new(tx))
            .await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok::<_, Infallible>(
            Event::default()
                .json_data(&event)
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
        )
    });
    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("ping"),
    );

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    ))
}

/// POST /api/evaluate
///
/// Scores a stored resume against its stored job description.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(body): Json<StoredResumeRequest>,
) -> Result<Json<EvaluationReport>, AppError> {
    let username = state.config.username_or_default(body.username.as_deref());
    let stored = state.store.get_resume(&username, &body.job_id).await?;
    let job = state.store.get_job(&body.job_id).await?;

    let report = Evaluator::new(&state.llm, &job.jd_text)
        .evaluate(&stored.resume)
        .await?;
    Ok(Json(report))
}

/// POST /api/factuality
///
/// Checks a stored resume against the user's profile.
pub async fn handle_factuality(
    State(state): State<AppState>,
    Json(body): Json<StoredResumeRequest>,
) -> Result<Json<FactualityReport>, AppError> {
    let username = state.config.username_or_default(body.username.as_deref());
    let stored = state.store.get_resume(&username, &body.job_id).await?;
    let profile = state.store.get_profile(&username).await?;

    let report = FactualityChecker::new(&state.llm, &profile)
        .check(&stored.resume)
        .await?;
    Ok(Json(report))
}
