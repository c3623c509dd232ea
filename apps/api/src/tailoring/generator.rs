//! Resume Generation: drafts the first tailored resume from the profile and JD.

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{FORMAT_RULES, GROUNDING_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::resume::TailoredResume;
use crate::models::user::UserProfile;
use crate::tailoring::prompts::GENERATION_PROMPT_TEMPLATE;

const GENERATION_MAX_TOKENS: u32 = 8000;

/// Generates a tailored resume for `role` at `company`.
pub async fn generate(
    llm: &LlmClient,
    jd_text: &str,
    profile: &UserProfile,
    company: &str,
    role: &str,
) -> Result<TailoredResume, AppError> {
    let prompt = build_generation_prompt(jd_text, profile, company, role)?;

    let resume: TailoredResume = llm
        .call_json(&prompt, GENERATION_MAX_TOKENS)
        .await
        .map_err(|e| AppError::Llm(format!("Generation LLM call failed: {e}")))?;

    if resume.is_empty() {
        return Err(AppError::Llm(
            "Generation returned a resume with no summary, skills, experience or projects"
                .to_string(),
        ));
    }

    info!(
        "Generated resume for {role} at {company}: {} skill categories, {} roles, {} projects",
        resume.skills.len(),
        resume.experience.len(),
        resume.projects.len()
    );
    Ok(resume)
}

fn build_generation_prompt(
    jd_text: &str,
    profile: &UserProfile,
    company: &str,
    role: &str,
) -> Result<String, AppError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;

    Ok(GENERATION_PROMPT_TEMPLATE
        .replace("{format_rules}", FORMAT_RULES)
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{company}", company)
        .replace("{role}", role)
        .replace("{jd_text}", jd_text)
        .replace("{profile_json}", &profile_json))
}
