//! Flat-file store for user profiles, jobs and generated resumes.
//!
//! Layout under the data directory:
//! - `users/<username>/profile.json`
//! - `jobs/<job_id>.json`
//! - `resumes/<username>/<job_id>.json`

pub mod handlers;

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::job::{JobPosting, JobSummary};
use crate::models::resume::{ResumeMetadata, ResumeSummary, StoredResume, TailoredResume};
use crate::models::user::UserProfile;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid identifier '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidId(String),

    #[error("Profile must be a JSON object")]
    InvalidProfile,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle to the data directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_path(&self, username: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .root
            .join("users")
            .join(validate_id(username)?)
            .join("profile.json"))
    }

    fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    fn job_path(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        Ok(self.jobs_dir().join(format!("{}.json", validate_id(job_id)?)))
    }

    fn resumes_dir(&self, username: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join("resumes").join(validate_id(username)?))
    }

    fn resume_path(&self, username: &str, job_id: &str) -> Result<PathBuf, StorageError> {
        Ok(self
            .resumes_dir(username)?
            .join(format!("{}.json", validate_id(job_id)?)))
    }

    // ── Users ───────────────────────────────────────────────────────────────

    pub async fn get_profile(&self, username: &str) -> Result<UserProfile, StorageError> {
        let path = self.profile_path(username)?;
        let value: Value = read_json(&path, || format!("User profile not found: {username}")).await?;
        UserProfile::from_value(value).ok_or(StorageError::InvalidProfile)
    }

    pub async fn save_profile(
        &self,
        username: &str,
        profile: &UserProfile,
    ) -> Result<PathBuf, StorageError> {
        let path = self.profile_path(username)?;
        write_json(&path, profile).await?;
        Ok(path)
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    pub async fn get_job(&self, job_id: &str) -> Result<JobPosting, StorageError> {
        let path = self.job_path(job_id)?;
        read_json(&path, || format!("Job not found: {job_id}")).await
    }

    pub async fn save_job(&self, job_id: &str, job: &JobPosting) -> Result<PathBuf, StorageError> {
        let path = self.job_path(job_id)?;
        write_json(&path, job).await?;
        Ok(path)
    }

    /// All jobs sorted by id. Unreadable files are skipped.
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>, StorageError> {
        let mut jobs = Vec::new();
        for (job_id, path) in json_files(&self.jobs_dir()).await? {
            let label = job_id.clone();
            match read_json::<JobPosting>(&path, move || label).await {
                Ok(job) => jobs.push(JobSummary {
                    job_id,
                    company: job.company,
                    role: job.role,
                }),
                Err(e) => warn!("Skipping unreadable job file: {e}"),
            }
        }
        Ok(jobs)
    }

    // ── Resumes ─────────────────────────────────────────────────────────────

    /// Saves (overwrites) the resume for `username`/`job_id`, stamping metadata.
    pub async fn save_resume(
        &self,
        username: &str,
        job_id: &str,
        resume: &TailoredResume,
    ) -> Result<PathBuf, StorageError> {
        let path = self.resume_path(username, job_id)?;
        let stored = StoredResume {
            metadata: ResumeMetadata {
                username: username.to_string(),
                job_id: job_id.to_string(),
                updated_at: chrono::Utc::now().to_rfc3339(),
            },
            resume: resume.clone(),
        };
        write_json(&path, &stored).await?;
        debug!("Saved resume {username}/{job_id} to {}", path.display());
        Ok(path)
    }

    pub async fn get_resume(
        &self,
        username: &str,
        job_id: &str,
    ) -> Result<StoredResume, StorageError> {
        let path = self.resume_path(username, job_id)?;
        read_json(&path, || format!("Resume not found for {username}/{job_id}")).await
    }

    pub async fn resume_exists(&self, username: &str, job_id: &str) -> Result<bool, StorageError> {
        let path = self.resume_path(username, job_id)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }

    /// A user's resumes sorted by job id, joined with their job's company/role.
    pub async fn list_resumes(&self, username: &str) -> Result<Vec<ResumeSummary>, StorageError> {
        let mut resumes = Vec::new();
        for (job_id, path) in json_files(&self.resumes_dir(username)?).await? {
            let label = job_id.clone();
            let stored = match read_json::<StoredResume>(&path, move || label).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Skipping unreadable resume file: {e}");
                    continue;
                }
            };
            let (company, role) = match self.get_job(&job_id).await {
                Ok(job) => (job.company, job.role),
                Err(_) => (String::new(), String::new()),
            };
            resumes.push(ResumeSummary {
                job_id,
                company,
                role,
                updated_at: stored.metadata.updated_at,
            });
        }
        Ok(resumes)
    }
}

/// Temporary job id for an ad-hoc posting: `temp_<company>_<role>`, lower-cased,
/// with every non-alphanumeric character replaced by `_`.
pub fn job_slug(company: &str, role: &str) -> String {
    let slug = |s: &str| -> String {
        s.trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("temp_{}_{}", slug(company), slug(role))
}

fn validate_id(id: &str) -> Result<&str, StorageError> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(id)
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

async fn read_json<T: DeserializeOwned>(
    path: &Path,
    not_found: impl FnOnce() -> String,
) -> Result<T, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(not_found()))
        }
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json).await.map_err(io_err)
}

/// `(stem, path)` of every `*.json` file in `dir`, sorted by stem.
/// A missing directory is treated as empty.
async fn json_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, StorageError> {
    let io_err = |source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
