//! Evaluation: scores a resume against the job description.
//!
//! total (0–100) = keyword coverage (0–35, deterministic) + LLM judgement (0–65).

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::resume::TailoredResume;
use crate::tailoring::keywords::{keyword_score, round2};
use crate::tailoring::prompts::EVALUATION_PROMPT_TEMPLATE;

const EVALUATION_MAX_TOKENS: u32 = 6000;
/// Maximum points the LLM judgement can contribute.
pub const LLM_POINTS: f64 = 65.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionScores {
    pub experience: f64,   // 0 – 25
    pub skills: f64,       // 0 – 20
    pub projects: f64,     // 0 – 15
    pub presentation: f64, // 0 – 5
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionFeedback {
    pub experience: String,
    pub skills: String,
    pub projects: String,
    pub presentation: String,
}

/// Raw LLM judgement, before the keyword share is added.
#[derive(Debug, Clone, Deserialize)]
struct LlmEvaluation {
    score: f64,
    #[serde(default)]
    section_scores: SectionScores,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    section_feedback: SectionFeedback,
}

/// Full evaluation report. Serialized verbatim as reviser feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_score: f64,
    pub keyword_score: f64,
    pub llm_score: f64,
    pub section_scores: SectionScores,
    pub feedback: String,
    pub section_feedback: SectionFeedback,
}

/// Scores resumes against one job description.
pub struct Evaluator<'a> {
    llm: &'a LlmClient,
    jd_text: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(llm: &'a LlmClient, jd_text: &'a str) -> Self {
        Self { llm, jd_text }
    }

    pub async fn evaluate(&self, resume: &TailoredResume) -> Result<EvaluationReport, AppError> {
        let keyword_score = keyword_score(resume, self.jd_text);

        let prompt = build_evaluation_prompt(resume, self.jd_text)?;
        let llm_eval: LlmEvaluation = self
            .llm
            .call_json(&prompt, EVALUATION_MAX_TOKENS)
            .await
            .map_err(|e| AppError::Llm(format!("Evaluation LLM call failed: {e}")))?;

        let llm_score = round2(llm_eval.score.clamp(0.0, LLM_POINTS));

        Ok(EvaluationReport {
            total_score: round2(keyword_score + llm_score),
            keyword_score,
            llm_score,
            section_scores: llm_eval.section_scores,
            feedback: llm_eval.feedback,
            section_feedback: llm_eval.section_feedback,
        })
    }
}

fn build_evaluation_prompt(resume: &TailoredResume, jd_text: &str) -> Result<String, AppError> {
    let resume_json = serde_json::to_string_pretty(resume)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;

    Ok(EVALUATION_PROMPT_TEMPLATE
        .replace("{jd_text}", jd_text)
        .replace("{resume_json}", &resume_json))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::models::resume::SkillCategory;

    fn resume() -> TailoredResume {
        TailoredResume {
            summary: "Backend engineer".to_string(),
            skills: vec![SkillCategory {
                category: "Languages".to_string(),
                items: "Python, Rust".to_string(),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_total_is_keyword_plus_llm() {
        let provider = ScriptedProvider::new().then_json(json!({
            "score": 50,
            "section_scores": {"experience": 20, "skills": 15, "projects": 10, "presentation": 5},
            "feedback": "Solid",
            "section_feedback": {"experience": "Good metrics"}
        }));
        let llm = ScriptedProvider::client(provider.clone());

        // JD keywords: python, rust → both covered → 35
        let report = Evaluator::new(&llm, "Python and Rust")
            .evaluate(&resume())
            .await
            .unwrap();
        assert_eq!(report.keyword_score, 35.0);
        assert_eq!(report.llm_score, 50.0);
        assert_eq!(report.total_score, 85.0);
        assert_eq!(report.section_scores.skills, 15.0);
        assert_eq!(report.section_feedback.experience, "Good metrics");
        assert_eq!(report.section_feedback.projects, "");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Python and Rust"));
        assert!(prompt.contains("\"summary\": \"Backend engineer\""));
    }

    #[tokio::test]
    async fn test_llm_score_is_clamped() {
        let provider = ScriptedProvider::new().then_json(json!({"score": 90, "feedback": "?"}));
        let llm = ScriptedProvider::client(provider);

        let report = Evaluator::new(&llm, "Python and Kubernetes and Redis")
            .evaluate(&resume())
            .await
            .unwrap();
        assert_eq!(report.llm_score, 65.0);
        // 1 of 3 keywords → 11.67
        assert_eq!(report.total_score, 76.67);
    }

    #[tokio::test]
    async fn test_missing_score_is_an_llm_error() {
        let provider = ScriptedProvider::new().then_json(json!({"feedback": "no score"}));
        let llm = ScriptedProvider::client(provider);

        let err = Evaluator::new(&llm, "jd").evaluate(&resume()).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[test]
    fn test_report_serializes_all_fields() {
        let report = EvaluationReport {
            total_score: 70.0,
            keyword_score: 20.0,
            llm_score: 50.0,
            section_scores: SectionScores::default(),
            feedback: "ok".to_string(),
            section_feedback: SectionFeedback::default(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["total_score"], 70.0);
        assert!(value["section_scores"]["presentation"].is_number());
    }
}
