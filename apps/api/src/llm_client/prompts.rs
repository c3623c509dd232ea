// Shared prompt fragments used by every agent.
// Each agent's own templates live in tailoring/prompts.rs.

/// Appended to every JSON-producing prompt.
pub fn json_only_suffix(max_tokens: u32) -> String {
    format!(
        "Return ONLY valid JSON, no markdown, no explanation. Keep under {max_tokens} tokens."
    )
}

/// Reminder that the candidate profile is the only acceptable source of facts.
pub const GROUNDING_INSTRUCTION: &str = "\
    Use ONLY facts, metrics and technologies present in the user profile. \
    Do NOT fabricate, inflate or exaggerate anything. \
    If the profile does not support a claim, leave it out.";

/// Formatting contract shared by the generator and the reviser.
pub const FORMAT_RULES: &str = "\
1. Summary: 520-570 characters with **bold** markers around key technologies and metrics
2. Skills: Exactly 7 categories, 70-95 characters of items each, ordered by relevance to the role
3. Experience: one entry per role in the profile, most recent first, 4-5 bullets each (150-200 chars, **bold** markers)
4. Projects: Exactly 3 projects most relevant to the job, 2 bullets each (max 200 chars, **bold** markers)";
