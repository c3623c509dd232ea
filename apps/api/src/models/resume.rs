use serde::{Deserialize, Serialize};

/// Resume content as produced by the generator and reviser.
///
/// Every field defaults when the model omits it; text fields may carry
/// `**bold**` markers that the renderer turns into bold runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailoredResume {
    pub header: ResumeHeader,
    pub summary: String,
    pub skills: Vec<SkillCategory>,
    pub experience: Vec<ExperienceEntry>,
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeHeader {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCategory {
    pub category: String,
    pub items: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub location: String,
    pub duration: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub title: String,
    pub tech: String,
    pub bullet1: String,
    pub bullet2: String,
}

impl TailoredResume {
    /// True when the model produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty()
            && self.skills.is_empty()
            && self.experience.is_empty()
            && self.projects.is_empty()
    }
}

/// Bookkeeping stored next to every saved resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeMetadata {
    pub username: String,
    pub job_id: String,
    /// RFC 3339, UTC.
    pub updated_at: String,
}

/// On-disk shape of `resumes/<username>/<job_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResume {
    pub metadata: ResumeMetadata,
    pub resume: TailoredResume,
}

/// Row returned when listing a user's resumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSummary {
    pub job_id: String,
    pub company: String,
    pub role: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_llm_output_deserializes_with_defaults() {
        let json = r#"{
            "header": {"title": "Backend Engineer | Rust"},
            "summary": "Engineer with **5 years** of experience",
            "experience": [{"company": "Acme", "bullets": ["Built **X**"]}]
        }"#;
        let resume: TailoredResume = serde_json::from_str(json).unwrap();
        assert_eq!(resume.header.title, "Backend Engineer | Rust");
        assert!(resume.skills.is_empty());
        assert_eq!(resume.experience[0].company, "Acme");
        assert_eq!(resume.experience[0].role, "");
        assert!(!resume.is_empty());
    }

    #[test]
    fn test_unrelated_json_is_an_empty_resume() {
        let resume: TailoredResume = serde_json::from_str(r#"{"mock": "data"}"#).unwrap();
        assert!(resume.is_empty());
    }
}
