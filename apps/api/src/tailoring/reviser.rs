//! Revision: rewrites a resume to address evaluator or factuality feedback.

use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{FORMAT_RULES, GROUNDING_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::resume::TailoredResume;
use crate::models::user::UserProfile;
use crate::tailoring::prompts::REVISION_PROMPT_TEMPLATE;

const REVISION_MAX_TOKENS: u32 = 10000;

/// Which gate's feedback a revision addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Evaluation,
    Factuality,
}

impl RevisionKind {
    fn focus(self) -> &'static str {
        match self {
            RevisionKind::Evaluation => "JD alignment and relevance",
            RevisionKind::Factuality => "factual accuracy",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            RevisionKind::Evaluation => "Improve the resume to better match the job requirements",
            RevisionKind::Factuality => {
                "Fix any inaccuracies or fabrications. Use ONLY real data from the profile"
            }
        }
    }
}

/// Produces a revised resume. `feedback` is the serialized report of the gate
/// that rejected the current version.
pub async fn revise(
    llm: &LlmClient,
    current: &TailoredResume,
    jd_text: &str,
    profile: &UserProfile,
    feedback: &str,
    kind: RevisionKind,
) -> Result<TailoredResume, AppError> {
    let prompt = build_revision_prompt(current, jd_text, profile, feedback, kind)?;

    let revised: TailoredResume = llm
        .call_json(&prompt, REVISION_MAX_TOKENS)
        .await
        .map_err(|e| AppError::Llm(format!("Revision LLM call failed ({kind:?}): {e}")))?;

    if revised.is_empty() {
        return Err(AppError::Llm(format!(
            "Revision ({kind:?}) returned an empty resume"
        )));
    }

    info!("Revised resume for {}", kind.focus());
    Ok(revised)
}

fn build_revision_prompt(
    current: &TailoredResume,
    jd_text: &str,
    profile: &UserProfile,
    feedback: &str,
    kind: RevisionKind,
) -> Result<String, AppError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;
    let resume_json = serde_json::to_string_pretty(current)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;

    Ok(REVISION_PROMPT_TEMPLATE
        .replace("{format_rules}", FORMAT_RULES)
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{focus}", kind.focus())
        .replace("{instruction}", kind.instruction())
        .replace("{jd_text}", jd_text)
        .replace("{profile_json}", &profile_json)
        .replace("{resume_json}", &resume_json)
        .replace("{feedback}", feedback))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;

    fn profile() -> UserProfile {
        UserProfile::from_value(json!({"personal": {"name": "Ada"}})).unwrap()
    }

    fn current() -> TailoredResume {
        TailoredResume {
            summary: "Old summary".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_focus_depends_on_kind() {
        let eval = build_revision_prompt(&current(), "JD", &profile(), "{\"total_score\": 70}", RevisionKind::Evaluation)
            .unwrap();
        assert!(eval.contains("improve JD alignment and relevance"));
        assert!(eval.contains("better match the job requirements"));
        assert!(eval.contains("{\"total_score\": 70}"));
        assert!(eval.contains("Old summary"));

        let fact = build_revision_prompt(&current(), "JD", &profile(), "{}", RevisionKind::Factuality)
            .unwrap();
        assert!(fact.contains("improve factual accuracy"));
        assert!(fact.contains("Use ONLY real data from the profile"));
    }

    #[tokio::test]
    async fn test_revise_returns_new_resume() {
        let provider = ScriptedProvider::new().then_json(json!({"summary": "New summary"}));
        let llm = ScriptedProvider::client(provider.clone());

        let revised = revise(&llm, &current(), "JD", &profile(), "{}", RevisionKind::Evaluation)
            .await
            .unwrap();
        assert_eq!(revised.summary, "New summary");
        assert!(provider.prompts()[0].contains("10000 tokens"));
    }

    #[tokio::test]
    async fn test_revise_rejects_empty_output() {
        let provider = ScriptedProvider::new().then_json(json!({}));
        let llm = ScriptedProvider::client(provider);

        let err = revise(&llm, &current(), "JD", &profile(), "{}", RevisionKind::Factuality)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
