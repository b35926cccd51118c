use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to collaborator constructors by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub composio_api_key: String,
    pub composio_base_url: String,
    /// Absent means heuristic parsing/scoring and no generated profile fields.
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub gmail_entity_id: String,
    pub sheets_entity_id: String,
    pub calendar_entity_id: String,
    pub linkedin_entity_id: String,
    pub resume_dir: PathBuf,
    pub output_dir: PathBuf,
    pub interview_duration_minutes: u32,
    pub criteria_path: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset and blank values are
    /// both treated as missing.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let interview_duration_minutes = or("INTERVIEW_DURATION_MINUTES", "45")
            .parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .context("INTERVIEW_DURATION_MINUTES must be a positive whole number of minutes")?;

        Ok(Config {
            composio_api_key: get("COMPOSIO_API_KEY")
                .context("Required environment variable 'COMPOSIO_API_KEY' is not set")?,
            composio_base_url: or("COMPOSIO_BASE_URL", "https://backend.composio.dev"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_model: or("ANTHROPIC_MODEL", DEFAULT_MODEL),
            anthropic_base_url: or("ANTHROPIC_BASE_URL", DEFAULT_BASE_URL),
            gmail_entity_id: or("GMAIL_ENTITY_ID", "default"),
            sheets_entity_id: or("SHEETS_ENTITY_ID", "default"),
            calendar_entity_id: or("CALENDAR_ENTITY_ID", "default"),
            linkedin_entity_id: or("LINKEDIN_ENTITY_ID", "default"),
            resume_dir: PathBuf::from(or("RECRUITER_RESUME_DIR", "incoming_resumes")),
            output_dir: PathBuf::from(or("RECRUITER_OUTPUT_DIR", "output")),
            interview_duration_minutes,
            criteria_path: get("RECRUITER_CRITERIA_PATH").map(PathBuf::from),
            rust_log: or("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_required_key() {
        let config = load(&[("COMPOSIO_API_KEY", "ck")]).unwrap();
        assert_eq!(config.composio_api_key, "ck");
        assert_eq!(config.composio_base_url, "https://backend.composio.dev");
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.anthropic_model, DEFAULT_MODEL);
        assert_eq!(config.anthropic_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.resume_dir, PathBuf::from("incoming_resumes"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.interview_duration_minutes, 45);
        assert!(config.criteria_path.is_none());
    }

    #[test]
    fn test_missing_actions_key_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("COMPOSIO_API_KEY"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = load(&[("COMPOSIO_API_KEY", "ck"), ("ANTHROPIC_API_KEY", "   ")]).unwrap();
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn test_interview_duration_must_be_positive() {
        assert!(load(&[("COMPOSIO_API_KEY", "ck"), ("INTERVIEW_DURATION_MINUTES", "0")]).is_err());
        assert!(load(&[("COMPOSIO_API_KEY", "ck"), ("INTERVIEW_DURATION_MINUTES", "half")]).is_err());
        let config = load(&[("COMPOSIO_API_KEY", "ck"), ("INTERVIEW_DURATION_MINUTES", "30")]).unwrap();
        assert_eq!(config.interview_duration_minutes, 30);
    }
}
