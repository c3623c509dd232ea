//! Tailoring pipeline: the revise-until-threshold loop.
//!
//! generate → evaluation phase → factuality phase → save → render.
//!
//! Each phase checks the current resume against one quality gate and, while
//! the score is below threshold, revises it with the gate's report as
//! feedback. A phase makes at most `max_revisions + 1` checks and always
//! hands on its last resume, passing or not.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::job::JobPosting;
use crate::models::resume::TailoredResume;
use crate::models::user::UserProfile;
use crate::render::Renderer;
use crate::state::AppState;
use crate::storage::{job_slug, FileStore};
use crate::tailoring::evaluator::{EvaluationReport, Evaluator};
use crate::tailoring::factuality::{FactualityChecker, FactualityReport};
use crate::tailoring::generator;
use crate::tailoring::progress::{ProgressEvent, ProgressReporter, Stage};
use crate::tailoring::reviser::{self, RevisionKind};

/// A scorer the pipeline can loop on.
#[async_trait]
pub trait QualityGate: Send + Sync {
    type Report: Serialize + Send;

    async fn check(&self, resume: &TailoredResume) -> Result<Self::Report, AppError>;

    /// 0 – 100.
    fn score(report: &Self::Report) -> f64;
}

#[async_trait]
impl<'a> QualityGate for Evaluator<'a> {
    type Report = EvaluationReport;

    async fn check(&self, resume: &TailoredResume) -> Result<EvaluationReport, AppError> {
        self.evaluate(resume).await
    }

    fn score(report: &EvaluationReport) -> f64 {
        report.total_score
    }
}

#[async_trait]
impl<'a> QualityGate for FactualityChecker<'a> {
    type Report = FactualityReport;

    async fn check(&self, resume: &TailoredResume) -> Result<FactualityReport, AppError> {
        FactualityChecker::check(self, resume).await
    }

    fn score(report: &FactualityReport) -> f64 {
        report.factuality_score
    }
}

/// Stage names and progress window of one phase.
struct Phase {
    label: &'static str,
    checking: Stage,
    result: Stage,
    passed: Stage,
    max_reached: Stage,
    revising: Stage,
    revision: RevisionKind,
    /// Check `i` reports `base + 10i`, its result `+5`, its revision `+10`.
    base: u32,
    end: u8,
}

impl Phase {
    const EVALUATION: Phase = Phase {
        label: "Evaluation",
        checking: Stage::Evaluating,
        result: Stage::EvaluationResult,
        passed: Stage::EvaluationPassed,
        max_reached: Stage::EvaluationMaxReached,
        revising: Stage::RevisingEvaluation,
        revision: RevisionKind::Evaluation,
        base: 25,
        end: 50,
    };

    const FACTUALITY: Phase = Phase {
        label: "Factuality",
        checking: Stage::CheckingFactuality,
        result: Stage::FactualityResult,
        passed: Stage::FactualityPassed,
        max_reached: Stage::FactualityMaxReached,
        revising: Stage::RevisingFactuality,
        revision: RevisionKind::Factuality,
        base: 50,
        end: 80,
    };

    /// Clamped so progress never runs past the phase end.
    fn progress(&self, iteration: u32, offset: u32) -> u8 {
        let raw = self.base + offset + 10 * iteration;
        raw.min(u32::from(self.end)) as u8
    }

    fn checking_message(&self, iteration: u32, attempts: u32) -> String {
        match self.revision {
            RevisionKind::Evaluation => format!(
                "Evaluating resume against job requirements (attempt {iteration}/{attempts})..."
            ),
            RevisionKind::Factuality => {
                format!("Verifying factual accuracy (attempt {iteration}/{attempts})...")
            }
        }
    }

    fn passed_message(&self, score: f64) -> String {
        match self.revision {
            RevisionKind::Evaluation => format!("Resume meets quality threshold ({score}/100)"),
            RevisionKind::Factuality => format!("Resume is factually accurate ({score}/100)"),
        }
    }

    fn revising_message(&self, iteration: u32) -> String {
        match self.revision {
            RevisionKind::Evaluation => {
                format!("Improving resume based on feedback (revision {iteration})...")
            }
            RevisionKind::Factuality => {
                format!("Fixing factuality issues (revision {iteration})...")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TailorRequest {
    pub username: String,
    pub jd_text: String,
    pub company: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TailorScores {
    pub evaluation: EvaluationReport,
    pub factuality: FactualityReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub json_path: String,
    pub docx_path: Option<String>,
    pub job_id: String,
}

/// Final result of a full run; also the `data` of the `complete` event.
#[derive(Debug, Clone, Serialize)]
pub struct TailorOutcome {
    pub resume: TailoredResume,
    pub scores: TailorScores,
    pub paths: OutputPaths,
}

/// Owns everything a run needs so it can outlive the request handler.
#[derive(Clone)]
pub struct TailoringPipeline {
    llm: LlmClient,
    store: FileStore,
    renderer: Renderer,
    output_dir: PathBuf,
    eval_threshold: f64,
    factuality_threshold: f64,
    max_revisions: u32,
}

impl TailoringPipeline {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            llm: state.llm.clone(),
            store: state.store.clone(),
            renderer: state.renderer.clone(),
            output_dir: state.config.output_dir.clone(),
            eval_threshold: state.config.eval_threshold,
            factuality_threshold: state.config.factuality_threshold,
            max_revisions: state.config.max_revisions,
        }
    }

    /// Generation only, no scoring or revision. Nothing is saved.
    pub async fn generate_only(&self, request: &TailorRequest) -> Result<TailoredResume, AppError> {
        let profile = self.store.get_profile(&request.username).await?;
        generator::generate(
            &self.llm,
            &request.jd_text,
            &profile,
            &request.company,
            &request.role,
        )
        .await
    }

    /// Runs the pipeline and turns a failure into a terminal `error` event.
    pub async fn run_reported(
        &self,
        request: &TailorRequest,
        reporter: &ProgressReporter,
    ) -> Result<TailorOutcome, AppError> {
        match self.run(request, reporter).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Tailoring run failed: {e}");
                reporter.emit(ProgressEvent::failed(&e)).await;
                Err(e)
            }
        }
    }

    #[instrument(
        skip_all,
        fields(run_id = %Uuid::new_v4(), username = %request.username, company = %request.company)
    )]
    pub async fn run(
        &self,
        request: &TailorRequest,
        reporter: &ProgressReporter,
    ) -> Result<TailorOutcome, AppError> {
        reporter
            .emit(ProgressEvent::new(
                Stage::Setup,
                5,
                "Loading user profile and initializing components...",
            ))
            .await;
        let profile = self.store.get_profile(&request.username).await?;

        reporter
            .emit(ProgressEvent::new(
                Stage::Generating,
                10,
                "Generating initial resume from job description...",
            ))
            .await;
        let resume = generator::generate(
            &self.llm,
            &request.jd_text,
            &profile,
            &request.company,
            &request.role,
        )
        .await?;
        reporter
            .emit(ProgressEvent::new(
                Stage::Generated,
                25,
                "Initial resume created successfully",
            ))
            .await;

        let evaluator = Evaluator::new(&self.llm, &request.jd_text);
        let (resume, evaluation) = self
            .run_phase(
                &Phase::EVALUATION,
                &evaluator,
                self.eval_threshold,
                resume,
                request,
                &profile,
                reporter,
            )
            .await?;

        let checker = FactualityChecker::new(&self.llm, &profile);
        let (resume, factuality) = self
            .run_phase(
                &Phase::FACTUALITY,
                &checker,
                self.factuality_threshold,
                resume,
                request,
                &profile,
                reporter,
            )
            .await?;

        reporter
            .emit(ProgressEvent::new(Stage::Saving, 85, "Saving resume to database..."))
            .await;
        let job_id = job_slug(&request.company, &request.role);
        self.store
            .save_job(
                &job_id,
                &JobPosting {
                    company: request.company.clone(),
                    role: request.role.clone(),
                    jd_text: request.jd_text.clone(),
                },
            )
            .await?;
        if self.store.resume_exists(&request.username, &job_id).await? {
            info!("Overwriting existing resume {}/{job_id}", request.username);
        }
        let json_path = self
            .store
            .save_resume(&request.username, &job_id, &resume)
            .await?;

        reporter
            .emit(ProgressEvent::new(
                Stage::Rendering,
                90,
                "Creating formatted DOCX document...",
            ))
            .await;
        let docx_path = self
            .render(&resume, &profile, &request.username, &job_id)
            .await?;

        let outcome = TailorOutcome {
            resume,
            scores: TailorScores {
                evaluation,
                factuality,
            },
            paths: OutputPaths {
                json_path: json_path.display().to_string(),
                docx_path: docx_path.map(|p| p.display().to_string()),
                job_id,
            },
        };
        info!(
            "Tailoring complete: evaluation {}, factuality {}",
            outcome.scores.evaluation.total_score, outcome.scores.factuality.factuality_score
        );
        reporter
            .emit(
                ProgressEvent::new(Stage::Complete, 100, "Resume optimization complete!")
                    .data(outcome.clone()),
            )
            .await;
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_phase<G: QualityGate>(
        &self,
        phase: &Phase,
        gate: &G,
        threshold: f64,
        mut resume: TailoredResume,
        request: &TailorRequest,
        profile: &UserProfile,
        reporter: &ProgressReporter,
    ) -> Result<(TailoredResume, G::Report), AppError> {
        let attempts = self.max_revisions.saturating_add(1);
        let mut iteration = 0;

        loop {
            iteration += 1;
            reporter
                .emit(
                    ProgressEvent::new(
                        phase.checking,
                        phase.progress(iteration, 0),
                        phase.checking_message(iteration, attempts),
                    )
                    .iteration(iteration),
                )
                .await;

            let report = gate.check(&resume).await?;
            let score = G::score(&report);
            reporter
                .emit(
                    ProgressEvent::new(
                        phase.result,
                        phase.progress(iteration, 5),
                        format!("{} score: {score}/100", phase.label),
                    )
                    .iteration(iteration)
                    .score(score),
                )
                .await;

            if score >= threshold {
                reporter
                    .emit(ProgressEvent::new(
                        phase.passed,
                        phase.end,
                        phase.passed_message(score),
                    ))
                    .await;
                return Ok((resume, report));
            }
            if iteration >= attempts {
                reporter
                    .emit(ProgressEvent::new(
                        phase.max_reached,
                        phase.end,
                        format!(
                            "Maximum {} attempts reached. Proceeding with score: {score}/100",
                            phase.label.to_lowercase()
                        ),
                    ))
                    .await;
                return Ok((resume, report));
            }

            reporter
                .emit(ProgressEvent::new(
                    phase.revising,
                    phase.progress(iteration, 10),
                    phase.revising_message(iteration),
                ))
                .await;
            let feedback = serde_json::to_string_pretty(&report).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to serialize feedback: {e}"))
            })?;
            resume = reviser::revise(
                &self.llm,
                &resume,
                &request.jd_text,
                profile,
                &feedback,
                phase.revision,
            )
            .await?;
        }
    }

    /// Renders `<output_dir>/<username>_<job_id>.docx`; `None` without a template.
    async fn render(
        &self,
        resume: &TailoredResume,
        profile: &UserProfile,
        username: &str,
        job_id: &str,
    ) -> Result<Option<PathBuf>, AppError> {
        if !self.renderer.template_exists() {
            warn!(
                "Template {} not found; skipping DOCX rendering",
                self.renderer.template_path().display()
            );
            return Ok(None);
        }

        let renderer = self.renderer.clone();
        let resume = resume.clone();
        let profile = profile.clone();
        let output = self.output_dir.join(format!("{username}_{job_id}.docx"));

        let path = tokio::task::spawn_blocking(move || renderer.render(&resume, &profile, &output))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Render task failed: {e}")))??;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;

    fn draft() -> Value {
        json!({
            "header": {"title": "Backend Engineer"},
            "summary": "Python engineer",
            "skills": [{"category": "Languages", "items": "Python"}]
        })
    }

    fn evaluation(score: f64) -> Value {
        json!({"score": score, "feedback": "ok"})
    }

    fn factuality(score: f64) -> Value {
        json!({"is_factual": score >= 90.0, "factuality_score": score, "issues": []})
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        pipeline: TailoringPipeline,
        store: FileStore,
        provider: ScriptedProvider,
    }

    async fn fixture(provider: ScriptedProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("database"));
        store
            .save_profile(
                "ada",
                &UserProfile::from_value(json!({"personal": {"name": "Ada"}})).unwrap(),
            )
            .await
            .unwrap();

        let pipeline = TailoringPipeline {
            llm: ScriptedProvider::client(provider.clone()),
            store: store.clone(),
            renderer: Renderer::new(dir.path().join("missing_template.docx")),
            output_dir: dir.path().join("output"),
            eval_threshold: 90.0,
            factuality_threshold: 90.0,
            max_revisions: 3,
        };
        Fixture {
            _dir: dir,
            pipeline,
            store,
            provider,
        }
    }

    // Keywords in "Python" JDs are fully covered, so evaluation = 35 + LLM score.
    fn request() -> TailorRequest {
        TailorRequest {
            username: "ada".to_string(),
            jd_text: "We use Python".to_string(),
            company: "Acme Corp".to_string(),
            role: "Backend Engineer".to_string(),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_passing_run_saves_and_completes() {
        let provider = ScriptedProvider::new()
            .then_json(draft())
            .then_json(evaluation(60.0))
            .then_json(factuality(95.0));
        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(64);

        let outcome = fx
            .pipeline
            .run_reported(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap();
        let events = collect(rx).await;

        let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::Setup,
                Stage::Generating,
                Stage::Generated,
                Stage::Evaluating,
                Stage::EvaluationResult,
                Stage::EvaluationPassed,
                Stage::CheckingFactuality,
                Stage::FactualityResult,
                Stage::FactualityPassed,
                Stage::Saving,
                Stage::Rendering,
                Stage::Complete,
            ]
        );
        let progress: Vec<u8> = events.iter().map(|e| e.progress).collect();
        assert_eq!(progress, vec![5, 10, 25, 35, 40, 50, 60, 65, 80, 85, 90, 100]);
        assert_eq!(events[4].score, Some(95.0));
        assert_eq!(events[4].iteration, Some(1));

        assert_eq!(outcome.paths.job_id, "temp_acme_corp_backend_engineer");
        assert!(outcome.paths.docx_path.is_none());
        assert_eq!(fx.provider.call_count(), 3);

        let stored = fx.store.get_resume("ada", &outcome.paths.job_id).await.unwrap();
        assert_eq!(stored.resume.summary, "Python engineer");
        let job = fx.store.get_job(&outcome.paths.job_id).await.unwrap();
        assert_eq!(job.company, "Acme Corp");

        let complete = events.last().unwrap().data.as_ref().unwrap();
        assert_eq!(complete.scores.factuality.factuality_score, 95.0);
    }

    #[tokio::test]
    async fn test_low_scores_revise_until_budget_is_spent() {
        let provider = ScriptedProvider::new().then_json(draft());
        for _ in 0..3 {
            provider.push_ok(&evaluation(10.0).to_string());
            provider.push_ok(&draft().to_string());
        }
        provider.push_ok(&evaluation(20.0).to_string());
        provider.push_ok(&factuality(50.0).to_string());
        provider.push_ok(&draft().to_string());
        provider.push_ok(&factuality(92.0).to_string());
        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(64);

        let outcome = fx
            .pipeline
            .run(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap();
        let events = collect(rx).await;

        let count = |stage: Stage| events.iter().filter(|e| e.stage == stage).count();
        assert_eq!(count(Stage::Evaluating), 4);
        assert_eq!(count(Stage::RevisingEvaluation), 3);
        assert_eq!(count(Stage::EvaluationMaxReached), 1);
        assert_eq!(count(Stage::EvaluationPassed), 0);
        assert_eq!(count(Stage::CheckingFactuality), 2);
        assert_eq!(count(Stage::RevisingFactuality), 1);
        assert_eq!(count(Stage::FactualityPassed), 1);

        assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
        assert_eq!(outcome.scores.evaluation.total_score, 55.0);
        assert_eq!(fx.provider.call_count(), 11);

        let revision_prompt = &fx.provider.prompts()[2];
        assert!(revision_prompt.contains("improve JD alignment and relevance"));
        assert!(revision_prompt.contains("\"llm_score\": 10.0"));
    }

    #[tokio::test]
    async fn test_failure_emits_single_error_event() {
        let provider = ScriptedProvider::new().then_ok("not json");
        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(64);

        let err = fx
            .pipeline
            .run_reported(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));

        let events = collect(rx).await;
        let last = events.last().unwrap();
        assert_eq!(last.stage, Stage::Error);
        assert_eq!(last.progress, 0);
        assert!(last.message.starts_with("Error: "));
        assert_eq!(events.iter().filter(|e| e.stage == Stage::Error).count(), 1);
        assert!(fx.store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_factuality_budget_exhausted_keeps_last_report() {
        let provider = ScriptedProvider::new()
            .then_json(draft())
            .then_json(evaluation(60.0));
        for score in [40.0, 50.0, 60.0] {
            provider.push_ok(&factuality(score).to_string());
            provider.push_ok(&draft().to_string());
        }
        provider.push_ok(&factuality(70.0).to_string());

        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(64);
        let outcome = fx
            .pipeline
            .run(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap();

        let events = collect(rx).await;
        let count = |stage: Stage| events.iter().filter(|e| e.stage == stage).count();
        assert_eq!(count(Stage::CheckingFactuality), 4);
        assert_eq!(count(Stage::RevisingFactuality), 3);
        assert_eq!(count(Stage::FactualityPassed), 0);
        assert_eq!(count(Stage::FactualityMaxReached), 1);

        let max_reached = events
            .iter()
            .find(|e| e.stage == Stage::FactualityMaxReached)
            .unwrap();
        assert_eq!(max_reached.progress, 80);
        assert!(max_reached.message.contains("70"));

        assert_eq!(outcome.scores.factuality.factuality_score, 70.0);
        assert!(!outcome.scores.factuality.is_factual);
        assert_eq!(events.last().unwrap().stage, Stage::Complete);
        assert_eq!(fx.provider.call_count(), 9);
    }

    #[tokio::test]
    async fn test_revision_failure_mid_phase_emits_single_error_event() {
        let provider = ScriptedProvider::new()
            .then_json(draft())
            .then_json(evaluation(10.0))
            .then_ok("not json");
        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(64);

        let err = fx
            .pipeline
            .run_reported(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));

        let events = collect(rx).await;
        assert_eq!(events.iter().filter(|e| e.stage == Stage::Error).count(), 1);
        assert_eq!(events.last().unwrap().stage, Stage::Error);
        assert_eq!(events[events.len() - 2].stage, Stage::RevisingEvaluation);
        assert_eq!(fx.provider.call_count(), 3);
        assert!(fx.store.list_jobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_fails_before_any_llm_call() {
        let fx = fixture(ScriptedProvider::new()).await;
        let mut req = request();
        req.username = "nobody".to_string();

        let err = fx
            .pipeline
            .run_reported(&req, &ProgressReporter::silent())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fx.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_stop_run() {
        let provider = ScriptedProvider::new()
            .then_json(draft())
            .then_json(evaluation(65.0))
            .then_json(factuality(100.0));
        let fx = fixture(provider).await;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = fx
            .pipeline
            .run_reported(&request(), &ProgressReporter::new(tx))
            .await
            .unwrap();
        assert!(fx
            .store
            .resume_exists("ada", &outcome.paths.job_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_generate_only_skips_scoring() {
        let fx = fixture(ScriptedProvider::new().then_json(draft())).await;
        let resume = fx.pipeline.generate_only(&request()).await.unwrap();
        assert_eq!(resume.header.title, "Backend Engineer");
        assert_eq!(fx.provider.call_count(), 1);
        assert!(fx.store.list_jobs().await.unwrap().is_empty());
    }

    #[test]
    fn test_phase_progress_is_clamped() {
        assert_eq!(Phase::EVALUATION.progress(1, 0), 35);
        assert_eq!(Phase::EVALUATION.progress(2, 5), 50);
        assert_eq!(Phase::EVALUATION.progress(4, 10), 50);
        assert_eq!(Phase::FACTUALITY.progress(1, 5), 65);
        assert_eq!(Phase::FACTUALITY.progress(3, 10), 80);
    }
}
