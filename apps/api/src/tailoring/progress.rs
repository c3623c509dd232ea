//! Progress events emitted while a tailoring run advances.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::tailoring::pipeline::TailorOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    Generating,
    Generated,
    Evaluating,
    EvaluationResult,
    EvaluationPassed,
    EvaluationMaxReached,
    RevisingEvaluation,
    CheckingFactuality,
    FactualityResult,
    FactualityPassed,
    FactualityMaxReached,
    RevisingFactuality,
    Saving,
    Rendering,
    Complete,
    Error,
}

/// One update on the progress stream. `progress` is a percentage.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TailorOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: progress.min(100),
            iteration: None,
            score: None,
            data: None,
            error: None,
        }
    }

    pub fn iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn data(mut self, outcome: TailorOutcome) -> Self {
        self.data = Some(outcome);
        self
    }

    /// Terminal failure event.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        let error = error.to_string();
        Self {
            error: Some(error.clone()),
            ..Self::new(Stage::Error, 0, format!("Error: {error}"))
        }
    }
}

/// Sink for progress events. Every event is logged; when a channel is
/// attached it is forwarded too. A dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Logs only.
    pub fn silent() -> Self {
        Self::default()
    }

    pub async fn emit(&self, event: ProgressEvent) {
        info!(
            stage = ?event.stage,
            progress = event.progress,
            "{}",
            event.message
        );
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                debug!("Progress receiver dropped; continuing without streaming");
            }
        }
    }
}
