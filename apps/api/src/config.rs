use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Upper bound on revisions per phase; each one costs an LLM call.
const MAX_REVISIONS_LIMIT: u32 = 10;

/// Which hosted LLM backs the tailoring agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    Anthropic,
}

impl FromStr for LlmProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => bail!("Unknown LLM_PROVIDER '{other}' (expected 'gemini' or 'anthropic')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProviderKind,
    pub llm_api_key: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub default_username: String,
    pub eval_threshold: f64,
    pub factuality_threshold: f64,
    pub max_revisions: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm_provider: LlmProviderKind = parse_or(&lookup, "LLM_PROVIDER", LlmProviderKind::Gemini)?;

        let llm_api_key = match llm_provider {
            LlmProviderKind::Gemini => lookup("GEMINI_API_KEY")
                .or_else(|| lookup("GOOGLE_API_KEY"))
                .context("Required environment variable 'GEMINI_API_KEY' or 'GOOGLE_API_KEY' is not set")?,
            LlmProviderKind::Anthropic => require(&lookup, "ANTHROPIC_API_KEY")?,
        };

        let max_revisions: u32 = parse_or(&lookup, "MAX_REVISIONS", 3)?;
        if max_revisions > MAX_REVISIONS_LIMIT {
            bail!("MAX_REVISIONS must be at most {MAX_REVISIONS_LIMIT}, got {max_revisions}");
        }
        let eval_threshold: f64 = parse_or(&lookup, "EVAL_THRESHOLD", 90.0)?;
        let factuality_threshold: f64 = parse_or(&lookup, "FACTUALITY_THRESHOLD", 90.0)?;

        for (key, value) in [
            ("EVAL_THRESHOLD", eval_threshold),
            ("FACTUALITY_THRESHOLD", factuality_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("{key} must be between 0 and 100, got {value}");
            }
        }

        Ok(Config {
            llm_provider,
            llm_api_key,
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "database".to_string()).into(),
            output_dir: lookup("OUTPUT_DIR").unwrap_or_else(|| "output".to_string()).into(),
            template_path: lookup("TEMPLATE_PATH")
                .unwrap_or_else(|| "templates/resume_template.docx".to_string())
                .into(),
            default_username: lookup("DEFAULT_USERNAME").unwrap_or_else(|| "default".to_string()),
            eval_threshold,
            factuality_threshold,
            max_revisions,
            port: parse_or(&lookup, "PORT", 8000)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Resolves an optional request username against the configured default.
    pub fn username_or_default(&self, username: Option<&str>) -> String {
        match username.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_username.clone(),
        }
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has invalid value '{raw}': {e}")),
    }
}
