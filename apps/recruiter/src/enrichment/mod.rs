//! Profile enrichment — primary profile lookup with a generated fallback.
//!
//! Every record comes out tagged with the path that produced its enrichment.
//! A missing or unreachable primary profile is an ordinary outcome, so
//! `Enricher::enrich` has no error type at all.

pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::actions::{ActionError, ActionsClient, LINKEDIN_GET_PROFILE};
use crate::config::Config;
use crate::enrichment::prompts::{PROFILE_PROMPT, PROFILE_SYSTEM};
use crate::llm_client::prompts::{fill, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::{keys, Candidate};

/// Which path produced a record's enrichment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvenanceTag {
    /// Primary profile found and its email matches the candidate's.
    #[serde(rename = "linkedin_api_verified")]
    VerifiedPrimary,
    /// Primary profile found, email missing or different.
    #[serde(rename = "linkedin_api_partial")]
    UnverifiedPrimary,
    /// The candidate had a profile URL but the primary source gave nothing usable.
    #[serde(rename = "llm_fallback")]
    FallbackSecondary,
    /// No profile URL to look up.
    #[serde(rename = "llm_only")]
    SecondaryOnly,
}

impl ProvenanceTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerifiedPrimary => "linkedin_api_verified",
            Self::UnverifiedPrimary => "linkedin_api_partial",
            Self::FallbackSecondary => "llm_fallback",
            Self::SecondaryOnly => "llm_only",
        }
    }

    /// Reads the tag back from an enriched record.
    pub fn of(candidate: &Candidate) -> Option<Self> {
        candidate
            .get(keys::ENRICHMENT_SOURCE)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, candidate: Candidate) -> Candidate;
}

/// Primary data source: a public profile looked up by URL.
/// `Ok(None)` means the source answered but had nothing for this URL.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn lookup(&self, profile_url: &str) -> Result<Option<Map<String, Value>>, ActionError>;
}

/// Secondary path: profile fields generated from what the record already says.
#[async_trait]
pub trait ProfileGenerator: Send + Sync {
    async fn generate(&self, candidate: &Candidate) -> Option<Map<String, Value>>;
}

pub struct LinkedInProfileSource {
    actions: ActionsClient,
    entity_id: String,
}

impl LinkedInProfileSource {
    pub fn new(actions: ActionsClient, config: &Config) -> Self {
        Self {
            actions,
            entity_id: config.linkedin_entity_id.clone(),
        }
    }
}

#[async_trait]
impl ProfileSource for LinkedInProfileSource {
    async fn lookup(&self, profile_url: &str) -> Result<Option<Map<String, Value>>, ActionError> {
        let data = self
            .actions
            .execute(
                LINKEDIN_GET_PROFILE,
                &self.entity_id,
                json!({ "profile_url": profile_url }),
            )
            .await?;
        Ok(profile_payload(data))
    }
}

fn profile_payload(data: Value) -> Option<Map<String, Value>> {
    let profile = match data {
        Value::Object(mut obj) => match obj.remove("response_dict").or_else(|| obj.remove("data")) {
            Some(Value::Object(inner)) => inner,
            _ => obj,
        },
        _ => return None,
    };
    (!profile.is_empty()).then_some(profile)
}

pub struct LlmProfileGenerator {
    llm: LlmClient,
}

impl LlmProfileGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ProfileGenerator for LlmProfileGenerator {
    async fn generate(&self, candidate: &Candidate) -> Option<Map<String, Value>> {
        let skills = candidate.list(keys::SKILLS);
        let skills = if skills.is_empty() {
            "General professional skills".to_string()
        } else {
            skills.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
        };
        let experience_count = candidate.count(keys::EXPERIENCE).to_string();
        let prompt = fill(
            PROFILE_PROMPT,
            &[
                ("name", candidate.name()),
                ("role", candidate.str_or(keys::CURRENT_ROLE, "")),
                ("company", candidate.str_or(keys::COMPANY, "")),
                ("skills", skills.as_str()),
                ("experience_count", experience_count.as_str()),
                ("constraints", NO_FABRICATION_INSTRUCTION),
            ],
        );

        match self.llm.call_json::<Value>(&prompt, PROFILE_SYSTEM).await {
            Ok(Value::Object(fields)) => Some(fields),
            Ok(_) => None,
            Err(e) => {
                warn!(candidate = candidate.name(), "profile generation failed: {e}");
                None
            }
        }
    }
}

pub struct ProfileEnricher {
    primary: Arc<dyn ProfileSource>,
    secondary: Option<Arc<dyn ProfileGenerator>>,
}

impl ProfileEnricher {
    pub fn new(primary: Arc<dyn ProfileSource>, secondary: Option<Arc<dyn ProfileGenerator>>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Enricher for ProfileEnricher {
    async fn enrich(&self, candidate: Candidate) -> Candidate {
        let mut enriched = candidate;
        let profile_url = enriched.str_or(keys::LINKEDIN_URL, "").to_string();

        let tag = if profile_url.contains("linkedin.com") {
            match self.primary.lookup(&profile_url).await {
                Ok(Some(profile)) => apply_profile(&mut enriched, &profile),
                Ok(None) => ProvenanceTag::FallbackSecondary,
                Err(e) => {
                    debug!(candidate = enriched.name(), "primary profile unavailable: {e}");
                    ProvenanceTag::FallbackSecondary
                }
            }
        } else {
            ProvenanceTag::SecondaryOnly
        };

        if let Some(generator) = &self.secondary {
            if let Some(fields) = generator.generate(&enriched).await {
                enriched.absorb(fields);
            }
        }

        enriched.set(keys::ENRICHMENT_SOURCE, tag.as_str());
        enriched
    }
}

fn apply_profile(candidate: &mut Candidate, profile: &Map<String, Value>) -> ProvenanceTag {
    let profile_email = profile
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let candidate_email = candidate.email().to_lowercase();

    if !candidate_email.is_empty() && candidate_email == profile_email {
        candidate.set(keys::LINKEDIN_VERIFIED, true);
        candidate.set(keys::LINKEDIN_EMAIL, profile_email);
        let mut extra = Map::new();
        for (from, to) in [("name", "linkedin_name"), ("picture", "linkedin_picture")] {
            if let Some(v) = profile.get(from) {
                extra.insert(to.to_string(), v.clone());
            }
        }
        candidate.absorb(extra);
        ProvenanceTag::VerifiedPrimary
    } else {
        candidate.set(keys::LINKEDIN_VERIFIED, false);
        candidate.set(keys::LINKEDIN_HAS_PROFILE, true);
        ProvenanceTag::UnverifiedPrimary
    }
}
