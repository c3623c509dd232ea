//! Factuality: verifies every resume claim against the user profile.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::resume::TailoredResume;
use crate::models::user::UserProfile;
use crate::tailoring::prompts::FACTUALITY_PROMPT_TEMPLATE;

const FACTUALITY_MAX_TOKENS: u32 = 10000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionCheck {
    pub is_accurate: bool,
    pub issues: Vec<String>,
}

impl Default for SectionCheck {
    fn default() -> Self {
        Self {
            is_accurate: true,
            issues: Vec::new(),
        }
    }
}

/// Factuality verdict. Serialized verbatim as reviser feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactualityReport {
    pub is_factual: bool,
    pub factuality_score: f64, // 0 – 100
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub summary_check: SectionCheck,
    #[serde(default)]
    pub experience_check: SectionCheck,
    #[serde(default)]
    pub projects_check: SectionCheck,
    #[serde(default)]
    pub skills_check: SectionCheck,
}

impl FactualityReport {
    /// Top-level issues followed by every section's issues.
    pub fn all_issues(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .chain(&self.summary_check.issues)
            .chain(&self.experience_check.issues)
            .chain(&self.projects_check.issues)
            .chain(&self.skills_check.issues)
            .map(String::as_str)
    }
}

/// Checks resumes against one user profile.
pub struct FactualityChecker<'a> {
    llm: &'a LlmClient,
    profile: &'a UserProfile,
}

impl<'a> FactualityChecker<'a> {
    pub fn new(llm: &'a LlmClient, profile: &'a UserProfile) -> Self {
        Self { llm, profile }
    }

    pub async fn check(&self, resume: &TailoredResume) -> Result<FactualityReport, AppError> {
        let prompt = build_factuality_prompt(resume, self.profile)?;
        let mut report: FactualityReport = self
            .llm
            .call_json(&prompt, FACTUALITY_MAX_TOKENS)
            .await
            .map_err(|e| AppError::Llm(format!("Factuality LLM call failed: {e}")))?;

        report.factuality_score = report.factuality_score.clamp(0.0, 100.0);
        debug!(
            "Factuality score {} with {} issue(s)",
            report.factuality_score,
            report.all_issues().count()
        );
        Ok(report)
    }
}

fn build_factuality_prompt(
    resume: &TailoredResume,
    profile: &UserProfile,
) -> Result<String, AppError> {
    let serialize = |what: &str, result: serde_json::Result<String>| {
        result.map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize {what}: {e}")))
    };
    let profile_json = serialize("profile", serde_json::to_string_pretty(profile))?;
    let resume_json = serialize("resume", serde_json::to_string_pretty(resume))?;

    Ok(FACTUALITY_PROMPT_TEMPLATE
        .replace("{profile_json}", &profile_json)
        .replace("{resume_json}", &resume_json))
}
