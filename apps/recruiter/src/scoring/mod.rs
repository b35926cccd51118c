//! Candidate scoring — pluggable, trait-based scorer that measures a candidate
//! record against the hiring criteria.
//!
//! `HeuristicScorer` is pure Rust and deterministic. `LlmCandidateScorer`
//! asks the model and falls back to the heuristic on any LLM failure, so a
//! missing or flaky model never costs a run its scores.

pub mod prompts;

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::llm_client::prompts::{fill, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::{keys, Candidate};
use crate::scoring::prompts::{SCORING_PROMPT, SCORING_SYSTEM};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("LLM scoring failed: {0}")]
    Llm(#[from] LlmError),

    #[error("could not read criteria file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid criteria file: {0}")]
    Criteria(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// What the hiring team is looking for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringCriteria {
    pub role: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub min_experience_years: u32,
    pub values: Vec<String>,
}

impl Default for ScoringCriteria {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            role: "AI/Software Professional".to_string(),
            required_skills: owned(&[
                "python",
                "machine learning",
                "ai",
                "data science",
                "software engineering",
                "algorithms",
            ]),
            preferred_skills: owned(&[
                "react",
                "node.js",
                "leadership",
                "cloud computing",
                "project management",
                "deep learning",
                "nlp",
                "computer vision",
            ]),
            min_experience_years: 2,
            values: owned(&["innovation", "impact", "collaboration", "continuous learning"]),
        }
    }
}

impl ScoringCriteria {
    /// Loads criteria from a JSON file; missing fields take the defaults.
    pub fn load(path: &Path) -> Result<Self, ScoringError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    Llm,
    Heuristic,
}

impl ScoringMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub score: f64,
    pub rationale: String,
    pub method: ScoringMethod,
}

/// Bounds any scorer's output to the 0–10 scale.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return MIN_SCORE;
    }
    raw.clamp(MIN_SCORE, MAX_SCORE)
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(
        &self,
        candidate: &Candidate,
        criteria: &ScoringCriteria,
    ) -> Result<ScoreOutcome, ScoringError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicScorer
// ────────────────────────────────────────────────────────────────────────────

/// Keyword scorer. Same input, same output, no I/O.
///
/// Algorithm:
/// 1. Lower-case candidate skills and both criteria skill lists.
/// 2. +1.5 per required match, +0.8 per preferred match, +0.5 per experience entry.
/// 3. Round to one decimal, cap at 10.
pub struct HeuristicScorer;

#[async_trait]
impl CandidateScorer for HeuristicScorer {
    async fn score(
        &self,
        candidate: &Candidate,
        criteria: &ScoringCriteria,
    ) -> Result<ScoreOutcome, ScoringError> {
        Ok(heuristic_score(candidate, criteria))
    }
}

fn lowercase_set(items: &[String]) -> BTreeSet<String> {
    items.iter().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect()
}

fn join_or_none(items: &BTreeSet<&String>) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

pub fn heuristic_score(candidate: &Candidate, criteria: &ScoringCriteria) -> ScoreOutcome {
    let skills = lowercase_set(&candidate.list(keys::SKILLS));
    let required = lowercase_set(&criteria.required_skills);
    let preferred = lowercase_set(&criteria.preferred_skills);

    let required_matches: BTreeSet<&String> = skills.intersection(&required).collect();
    let preferred_matches: BTreeSet<&String> = skills.intersection(&preferred).collect();
    let experience_count = candidate.count(keys::EXPERIENCE);

    let raw = required_matches.len() as f64 * 1.5
        + preferred_matches.len() as f64 * 0.8
        + experience_count as f64 * 0.5;
    let score = ((raw * 10.0).round() / 10.0).min(MAX_SCORE);

    let rationale = format!(
        "Matched {}/{} required skills ({}), {}/{} preferred skills ({}), with {} job experience(s).",
        required_matches.len(),
        required.len(),
        join_or_none(&required_matches),
        preferred_matches.len(),
        preferred.len(),
        join_or_none(&preferred_matches),
        experience_count,
    );

    ScoreOutcome {
        score,
        rationale,
        method: ScoringMethod::Heuristic,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmCandidateScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmScore {
    score: f64,
    #[serde(default)]
    rationale: String,
}

pub struct LlmCandidateScorer {
    llm: LlmClient,
}

impl LlmCandidateScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    async fn ask(
        &self,
        candidate: &Candidate,
        criteria: &ScoringCriteria,
    ) -> Result<ScoreOutcome, ScoringError> {
        let criteria_json = serde_json::to_string_pretty(criteria)?;
        let candidate_json = serde_json::to_string_pretty(candidate)?;
        let prompt = fill(
            SCORING_PROMPT,
            &[
                ("criteria", criteria_json.as_str()),
                ("candidate", candidate_json.as_str()),
                ("constraints", NO_FABRICATION_INSTRUCTION),
            ],
        );
        let parsed: LlmScore = self.llm.call_json(&prompt, SCORING_SYSTEM).await?;
        Ok(ScoreOutcome {
            score: clamp_score(parsed.score),
            rationale: parsed.rationale,
            method: ScoringMethod::Llm,
        })
    }
}

#[async_trait]
impl CandidateScorer for LlmCandidateScorer {
    async fn score(
        &self,
        candidate: &Candidate,
        criteria: &ScoringCriteria,
    ) -> Result<ScoreOutcome, ScoringError> {
        match self.ask(candidate, criteria).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(candidate = candidate.name(), "LLM scoring failed, using heuristic: {e}");
                Ok(heuristic_score(candidate, criteria))
            }
        }
    }
}
