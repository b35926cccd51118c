//! Stage functions. Each takes the state by value, calls exactly one
//! collaborator, merges the result and hands back the new state.
//! Failures are recorded on the state; nothing here returns `Err`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::config::Config;
use crate::enrichment::{Enricher, ProvenanceTag};
use crate::export::rows::{csv_rows, interview_rows, roster_rows};
use crate::export::{ArtifactWriter, SpreadsheetExporter};
use crate::intake::{scan_directory, DocumentParser, MailFetcher};
use crate::models::{keys, Candidate};
use crate::pipeline::report::PipelineReport;
use crate::pipeline::state::{PipelineState, PipelineStatus, StageName};
use crate::scheduling::InterviewScheduler;
use crate::scoring::{clamp_score, CandidateScorer, ScoringCriteria, ScoringError};

/// Run-independent settings the stages need besides their collaborators.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub resume_dir: PathBuf,
    pub output_dir: PathBuf,
    pub interview_duration_minutes: u32,
    pub criteria: ScoringCriteria,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, criteria: ScoringCriteria) -> Self {
        Self {
            resume_dir: config.resume_dir.clone(),
            output_dir: config.output_dir.clone(),
            interview_duration_minutes: config.interview_duration_minutes,
            criteria,
        }
    }
}

pub(crate) struct Stages {
    pub(crate) mail: Arc<dyn MailFetcher>,
    pub(crate) parser: Arc<dyn DocumentParser>,
    pub(crate) enricher: Arc<dyn Enricher>,
    pub(crate) scorer: Arc<dyn CandidateScorer>,
    pub(crate) scheduler: Arc<dyn InterviewScheduler>,
    pub(crate) sheets: Arc<dyn SpreadsheetExporter>,
    pub(crate) artifacts: ArtifactWriter,
    pub(crate) settings: PipelineSettings,
}

fn sheet_title(prefix: &str) -> String {
    format!("{prefix} - {}", Local::now().format("%Y-%m-%d %H:%M"))
}

impl Stages {
    pub(crate) async fn run(&self, stage: StageName, state: PipelineState) -> PipelineState {
        match stage {
            StageName::Fetch => self.fetch(state).await,
            StageName::Extract => self.extract(state).await,
            StageName::Enrich => self.enrich(state).await,
            StageName::Score => self.score(state).await,
            StageName::Schedule => self.schedule(state).await,
            StageName::ExportAll => self.export_all(state).await,
            StageName::ExportShortlist => self.export_shortlist(state).await,
            StageName::Report => report(state),
        }
    }

    async fn fetch(&self, mut state: PipelineState) -> PipelineState {
        let max_items = state.config().max_items;

        if !state.config().check_mail {
            state.downloaded = scan_directory(&self.settings.resume_dir, max_items);
            state.status = PipelineStatus::MailSkipped;
            info!(documents = state.downloaded.len(), "mail check skipped, using local inbox");
            return state;
        }

        match self.mail.fetch(max_items).await {
            Ok(mut documents) => {
                documents.truncate(max_items);
                info!(documents = documents.len(), "resumes fetched");
                state.downloaded = documents;
                state.status = PipelineStatus::MailComplete;
            }
            Err(e) => {
                warn!("mail fetch failed: {e}");
                state.record_error(StageName::Fetch, e.to_string());
                state.downloaded = Vec::new();
                state.status = PipelineStatus::MailFailed;
            }
        }
        state
    }

    async fn extract(&self, mut state: PipelineState) -> PipelineState {
        let documents = state.downloaded.clone();
        let mut extracted = Vec::with_capacity(documents.len());

        for document in &documents {
            match self.parser.parse(document).await {
                Ok(candidate) => extracted.push(candidate),
                Err(e) => {
                    warn!(file = %document.file_name(), "document skipped: {e}");
                    state.record_error(StageName::Extract, format!("{}: {e}", document.file_name()));
                }
            }
        }

        state.status = if !extracted.is_empty() {
            PipelineStatus::ExtractionComplete
        } else if documents.is_empty() {
            PipelineStatus::NoCandidates
        } else {
            PipelineStatus::ExtractionFailed
        };
        info!(documents = documents.len(), candidates = extracted.len(), "extraction finished");
        state.extracted = extracted;
        state
    }

    async fn enrich(&self, mut state: PipelineState) -> PipelineState {
        let mut enriched = Vec::with_capacity(state.extracted.len());
        for candidate in state.extracted.iter().cloned() {
            enriched.push(self.enricher.enrich(candidate).await);
        }
        state.enriched = enriched;

        if !state.enriched.is_empty() {
            match self.artifacts.write_json("enriched_candidates", &state.enriched) {
                Ok(path) => {
                    state.outputs.set_json_path(path);
                }
                Err(e) => state.record_error(StageName::Enrich, e.to_string()),
            }
        }

        let tagged = |tag: ProvenanceTag| {
            state
                .enriched
                .iter()
                .filter(|c| ProvenanceTag::of(c) == Some(tag))
                .count()
        };
        info!(
            candidates = state.enriched.len(),
            verified = tagged(ProvenanceTag::VerifiedPrimary),
            partial = tagged(ProvenanceTag::UnverifiedPrimary),
            fallback = tagged(ProvenanceTag::FallbackSecondary),
            generated_only = tagged(ProvenanceTag::SecondaryOnly),
            "enrichment finished"
        );
        state.status = PipelineStatus::EnrichmentComplete;
        state
    }

    async fn score_all(&self, records: &[Candidate]) -> Result<Vec<Candidate>, ScoringError> {
        let criteria = &self.settings.criteria;
        let mut scored = Vec::with_capacity(records.len());
        for candidate in records {
            let outcome = self.scorer.score(candidate, criteria).await?;
            let mut record = candidate.clone();
            record.set(keys::SCORE, clamp_score(outcome.score));
            record.set(keys::RATIONALE, outcome.rationale);
            record.set(keys::SCORING_METHOD, outcome.method.as_str());
            scored.push(record);
        }
        Ok(scored)
    }

    async fn score(&self, mut state: PipelineState) -> PipelineState {
        let scored = match self.score_all(&state.enriched).await {
            Ok(scored) => scored,
            Err(e) => {
                warn!("scoring failed: {e}");
                state.record_error(StageName::Score, e.to_string());
                state.status = PipelineStatus::ScoringFailed;
                return state;
            }
        };

        let threshold = state.config().min_score_threshold;
        let (shortlisted, rejected): (Vec<Candidate>, Vec<Candidate>) = scored
            .iter()
            .cloned()
            .partition(|c| c.number(keys::SCORE).unwrap_or(0.0) >= threshold);

        info!(
            scored = scored.len(),
            shortlisted = shortlisted.len(),
            rejected = rejected.len(),
            threshold,
            "candidates scored"
        );
        state.scored = scored;
        state.shortlisted = shortlisted;
        state.rejected = rejected;
        state.status = PipelineStatus::ScoringComplete;
        state
    }

    async fn schedule(&self, mut state: PipelineState) -> PipelineState {
        let duration = self.settings.interview_duration_minutes;
        match self.scheduler.schedule(&state.shortlisted, duration).await {
            Ok(scheduled) => {
                state.scheduled = scheduled;
                state.status = PipelineStatus::SchedulingComplete;
            }
            Err(e) => {
                warn!("scheduling failed: {e}");
                state.record_error(StageName::Schedule, e.to_string());
                state.scheduled = Vec::new();
                state.status = PipelineStatus::SchedulingFailed;
            }
        }
        state
    }

    async fn export_all(&self, mut state: PipelineState) -> PipelineState {
        if state.enriched.is_empty() {
            state.status = PipelineStatus::RosterExported;
            return state;
        }

        let rows = roster_rows(&state.enriched);
        match self.sheets.export(&sheet_title("Candidate Roster"), rows).await {
            Ok(location) => {
                if let Some(url) = location {
                    state.outputs.set_roster_sheet(url);
                }
                state.status = PipelineStatus::RosterExported;
            }
            Err(e) => {
                warn!("roster export failed: {e}");
                state.record_error(StageName::ExportAll, e.to_string());
                state.status = PipelineStatus::RosterExportFailed;
            }
        }
        state
    }

    async fn export_shortlist(&self, mut state: PipelineState) -> PipelineState {
        if state.scheduled.is_empty() {
            state.status = PipelineStatus::ExportComplete;
            return state;
        }

        let mut failed = false;

        let rows = interview_rows(&state.scheduled);
        match self.sheets.export(&sheet_title("Interview Schedule"), rows).await {
            Ok(Some(url)) => {
                state.outputs.set_interview_sheet(url);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("interview sheet export failed: {e}");
                state.record_error(StageName::ExportShortlist, format!("interview sheet: {e}"));
                failed = true;
            }
        }

        match self.artifacts.write_csv("scheduled_interviews", &csv_rows(&state.scheduled)) {
            Ok(path) => {
                state.outputs.set_csv_path(path);
            }
            Err(e) => {
                warn!("interview csv export failed: {e}");
                state.record_error(StageName::ExportShortlist, format!("csv: {e}"));
                failed = true;
            }
        }

        let links: Vec<String> = state
            .scheduled
            .iter()
            .map(|c| c.str_or(keys::CALENDAR_EVENT_LINK, "").to_string())
            .filter(|link| !link.is_empty())
            .collect();
        state.outputs.set_calendar_links(links);

        state.status = if failed {
            PipelineStatus::ExportFailed
        } else {
            PipelineStatus::ExportComplete
        };
        state
    }
}

fn report(mut state: PipelineState) -> PipelineState {
    state.status = PipelineStatus::Complete;
    let report = PipelineReport::from_state(&state);
    info!(
        run_id = %report.run_id,
        route = report.route.as_str(),
        shortlisted = report.counts.shortlisted,
        scheduled = report.counts.scheduled,
        errors = report.errors.len(),
        "pipeline complete"
    );
    state
}
