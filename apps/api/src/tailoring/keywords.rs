//! Keyword coverage: the deterministic 35-point share of the evaluation score.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::models::resume::TailoredResume;

/// Points awarded for full keyword coverage.
pub const KEYWORD_POINTS: f64 = 35.0;

const TECH_PATTERNS: &[&str] = &[
    // Languages
    r"\b(Python|Java|JavaScript|TypeScript|Go|C\+\+|C#|SQL|Ruby|Rust)\b",
    // Frameworks
    r"\b(React|Next\.js|Django|Flask|FastAPI|Spring|Node\.js|Express)\b",
    // Cloud
    r"\b(AWS|Azure|GCP|Kubernetes|Docker|Lambda|EC2|S3|SQS)\b",
    // Databases
    r"\b(MySQL|PostgreSQL|MongoDB|Redis|DynamoDB)\b",
    // ML/AI
    r"\b(Machine Learning|Deep Learning|PyTorch|TensorFlow|AI)\b",
];

static TECH_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TECH_PATTERNS
        .iter()
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("valid tech keyword regex")
        })
        .collect()
});

/// Lower-cased technology keywords mentioned in a job description.
pub fn extract_jd_keywords(jd_text: &str) -> BTreeSet<String> {
    TECH_REGEXES
        .iter()
        .flat_map(|re| re.find_iter(jd_text))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Scores keyword coverage in `[0, 35]`, rounded to two decimals.
///
/// A keyword counts as covered when it appears anywhere in the resume's
/// JSON text (case-insensitive). A JD without recognisable keywords scores
/// full marks.
pub fn keyword_score(resume: &TailoredResume, jd_text: &str) -> f64 {
    let jd_keywords = extract_jd_keywords(jd_text);
    if jd_keywords.is_empty() {
        return KEYWORD_POINTS;
    }

    let resume_text = serde_json::to_string(resume)
        .unwrap_or_default()
        .to_lowercase();
    let matched = jd_keywords
        .iter()
        .filter(|k| resume_text.contains(k.as_str()))
        .count();

    round2(matched as f64 / jd_keywords.len() as f64 * KEYWORD_POINTS)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::SkillCategory;

    fn resume_with_skills(items: &str) -> TailoredResume {
        TailoredResume {
            skills: vec![SkillCategory {
                category: "Languages".to_string(),
                items: items.to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_is_case_insensitive_and_deduplicated() {
        let keywords = extract_jd_keywords("Python, python and AWS. Experience with node.js and C# a plus.");
        let expected: BTreeSet<String> = ["python", "aws", "node.js"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(keywords, expected);
    }

    #[test]
    fn test_no_keywords_scores_full_marks() {
        let resume = TailoredResume::default();
        assert_eq!(keyword_score(&resume, "We value kindness and curiosity."), 35.0);
    }

    #[test]
    fn test_partial_coverage() {
        // 1 of 3 keywords present → 11.67
        let resume = resume_with_skills("Python, Flask");
        let score = keyword_score(&resume, "Python, Kubernetes and Redis required");
        assert_eq!(score, 11.67);
    }

    #[test]
    fn test_full_coverage() {
        let resume = resume_with_skills("Rust, Docker, PostgreSQL");
        assert_eq!(keyword_score(&resume, "Rust + docker + PostgreSQL"), 35.0);
    }

    #[test]
    fn test_word_boundaries_apply_to_jd() {
        // "Going" must not register "go" as a JD keyword.
        assert!(extract_jd_keywords("Going forward, we are Goal-driven").is_empty());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(23.333333), 23.33);
        assert_eq!(round2(11.666666), 11.67);
    }
}
