use serde::{Deserialize, Serialize};

/// A target job as stored in `jobs/<job_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub company: String,
    pub role: String,
    pub jd_text: String,
}

/// Row returned when listing jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub company: String,
    pub role: String,
}
