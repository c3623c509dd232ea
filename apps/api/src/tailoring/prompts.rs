// All LLM prompt templates for the tailoring agents.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Generation prompt.
/// Replace: {company}, {role}, {jd_text}, {profile_json}, {format_rules}, {grounding_instruction}
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"You are an expert resume writer. Generate a tailored resume JSON for this role.

ROLE: {role} at {company}

JOB DESCRIPTION:
{jd_text}

USER PROFILE:
{profile_json}

INSTRUCTIONS:
{format_rules}

{grounding_instruction}

OUTPUT FORMAT (JSON only, no markdown):
{
  "header": {"title": "Role | Degree @ University | Top Keywords"},
  "summary": "...",
  "skills": [
    {"category": "Languages", "items": "Python, Java, Go, ..."},
    ...6 more categories
  ],
  "experience": [
    {
      "company": "Company name exactly as in the profile",
      "role": "Title exactly as in the profile",
      "location": "City",
      "duration": "MM-YYYY to MM-YYYY",
      "bullets": ["bullet1", "bullet2", "bullet3", "bullet4"]
    }
  ],
  "projects": [
    {
      "title": "Project name exactly as in the profile",
      "tech": "Tech1, Tech2, Tech3",
      "bullet1": "...",
      "bullet2": "..."
    }
  ]
}"#;

/// Evaluation prompt. The LLM part is worth 65 of the 100 points; keyword
/// matching supplies the other 35.
/// Replace: {jd_text}, {resume_json}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are an expert resume evaluator. Score this resume against the job description.

JOB DESCRIPTION:
{jd_text}

RESUME:
{resume_json}

Evaluate critically on these criteria:

1. EXPERIENCE RELEVANCE (25 points)
   - Do work bullets highlight JD-relevant achievements?
   - Are metrics compelling and specific?
   - Is the language tailored to this role?

2. SKILLS ALIGNMENT (20 points)
   - Are all key JD technologies present?
   - Are skills organized by importance to role?
   - Any critical missing skills?

3. PROJECTS RELEVANCE (15 points)
   - Do projects demonstrate required skills?
   - Are the right projects selected?
   - Do project bullets show depth?

4. PRESENTATION QUALITY (5 points)
   - Is summary compelling and concise?
   - Are bold markers used effectively?
   - Professional writing quality?

Be CRITICAL and SPECIFIC in feedback. Point out what's missing, what could be stronger, and what's done well.

Return ONLY this JSON:
{
  "score": 0-65,
  "section_scores": {
    "experience": 0-25,
    "skills": 0-20,
    "projects": 0-15,
    "presentation": 0-5
  },
  "feedback": "Overall assessment (2-3 sentences)",
  "section_feedback": {
    "experience": "What's good and what needs improvement",
    "skills": "What's good and what needs improvement",
    "projects": "What's good and what needs improvement",
    "presentation": "What's good and what needs improvement"
  }
}"#;

/// Factuality prompt.
/// Replace: {profile_json}, {resume_json}
pub const FACTUALITY_PROMPT_TEMPLATE: &str = r#"You are a strict factuality checker. Verify if ALL resume claims are accurate against the user's actual profile.

USER'S ACTUAL PROFILE (SOURCE OF TRUTH):
{profile_json}

GENERATED RESUME (TO VERIFY):
{resume_json}

Check EVERY claim for accuracy:

1. SUMMARY
   - Degrees, institutions and grades match the profile exactly?
   - Years of experience accurate?
   - Technologies actually used?
   - Metrics are real (not inflated)?

2. WORK EXPERIENCE
   - Company names, titles, dates match?
   - Metrics match the profile?
   - Technologies actually used at those companies?
   - Achievements based on real work?

3. PROJECTS
   - Project names exist in profile?
   - Technologies match what was actually used?
   - Metrics accurate?

4. SKILLS
   - Every listed skill is in user's profile?
   - No false expertise claims?

Be EXTREMELY CRITICAL. Flag:
- ANY metric that doesn't match profile
- ANY technology not in user's stack
- ANY project that doesn't exist
- ANY exaggeration or inflation

Return ONLY this JSON:
{
  "is_factual": true/false,
  "factuality_score": 0-100,
  "issues": ["Issue 1", "Issue 2"],
  "summary_check": {"is_accurate": true/false, "issues": ["Specific issue 1"]},
  "experience_check": {"is_accurate": true/false, "issues": ["Specific issue 1"]},
  "projects_check": {"is_accurate": true/false, "issues": ["Specific issue 1"]},
  "skills_check": {"is_accurate": true/false, "issues": ["Specific issue 1"]}
}

If everything is accurate, return empty arrays for issues."#;

/// Revision prompt.
/// Replace: {focus}, {jd_text}, {profile_json}, {resume_json}, {feedback},
///          {instruction}, {format_rules}, {grounding_instruction}
pub const REVISION_PROMPT_TEMPLATE: &str = r#"You are an expert resume writer. Revise this resume to improve {focus}.

JOB DESCRIPTION:
{jd_text}

USER PROFILE (SOURCE OF TRUTH):
{profile_json}

CURRENT RESUME:
{resume_json}

FEEDBACK TO ADDRESS:
{feedback}

TASK: {instruction}

CRITICAL REQUIREMENTS:
{format_rules}
5. Keep the same companies and roles as the current resume
6. {grounding_instruction}

Return ONLY the complete revised resume JSON in the same format:
{
  "header": {"title": "..."},
  "summary": "...",
  "skills": [...],
  "experience": [...],
  "projects": [...]
}"#;
