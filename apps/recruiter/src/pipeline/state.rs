//! The single value threaded through every stage of a run.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{keys, Candidate, DocumentRef};

/// Nodes of the fixed pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Fetch,
    Extract,
    Enrich,
    Score,
    Schedule,
    ExportAll,
    ExportShortlist,
    Report,
}

impl StageName {
    pub const ALL: [StageName; 8] = [
        Self::Fetch,
        Self::Extract,
        Self::Enrich,
        Self::Score,
        Self::Schedule,
        Self::ExportAll,
        Self::ExportShortlist,
        Self::Report,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Enrich => "enrich",
            Self::Score => "score",
            Self::Schedule => "schedule",
            Self::ExportAll => "export_all",
            Self::ExportShortlist => "export_shortlist",
            Self::Report => "report",
        }
    }

    /// Tag shown in front of a failure message.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fetch => "Mail",
            Self::Extract => "Extraction",
            Self::Enrich => "Enrichment",
            Self::Score => "Scoring",
            Self::Schedule => "Scheduling",
            Self::ExportAll => "Roster export",
            Self::ExportShortlist => "Export",
            Self::Report => "Report",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Started,
    MailComplete,
    MailSkipped,
    MailFailed,
    ExtractionComplete,
    ExtractionFailed,
    NoCandidates,
    EnrichmentComplete,
    ScoringComplete,
    ScoringFailed,
    SchedulingComplete,
    SchedulingFailed,
    RosterExported,
    RosterExportFailed,
    ExportComplete,
    ExportFailed,
    Complete,
}

/// A stage-local failure. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: StageName,
    pub message: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage.label(), self.message)
    }
}

/// Per-run settings, fixed when the state is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunConfig {
    pub check_mail: bool,
    pub max_items: usize,
    pub min_score_threshold: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            check_mail: true,
            max_items: 10,
            min_score_threshold: 5.0,
        }
    }
}

/// Where a run's outputs ended up. Each locator is written at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputLocators {
    json_path: Option<PathBuf>,
    roster_sheet: Option<String>,
    interview_sheet: Option<String>,
    csv_path: Option<PathBuf>,
    calendar_links: Vec<String>,
}

fn write_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

impl OutputLocators {
    pub fn json_path(&self) -> Option<&PathBuf> {
        self.json_path.as_ref()
    }

    pub fn roster_sheet(&self) -> Option<&str> {
        self.roster_sheet.as_deref()
    }

    pub fn interview_sheet(&self) -> Option<&str> {
        self.interview_sheet.as_deref()
    }

    pub fn csv_path(&self) -> Option<&PathBuf> {
        self.csv_path.as_ref()
    }

    pub fn calendar_links(&self) -> &[String] {
        &self.calendar_links
    }

    /// Each setter returns `false` and leaves the locator alone if it was already written.
    pub fn set_json_path(&mut self, path: PathBuf) -> bool {
        write_once(&mut self.json_path, path)
    }

    pub fn set_roster_sheet(&mut self, url: String) -> bool {
        write_once(&mut self.roster_sheet, url)
    }

    pub fn set_interview_sheet(&mut self, url: String) -> bool {
        write_once(&mut self.interview_sheet, url)
    }

    pub fn set_csv_path(&mut self, path: PathBuf) -> bool {
        write_once(&mut self.csv_path, path)
    }

    pub fn set_calendar_links(&mut self, links: Vec<String>) -> bool {
        if !self.calendar_links.is_empty() {
            return false;
        }
        self.calendar_links = links;
        true
    }

    /// True when every locator written in `earlier` is unchanged here.
    pub fn preserves(&self, earlier: &OutputLocators) -> bool {
        fn kept<T: PartialEq>(before: &Option<T>, after: &Option<T>) -> bool {
            before.is_none() || before == after
        }
        kept(&earlier.json_path, &self.json_path)
            && kept(&earlier.roster_sheet, &self.roster_sheet)
            && kept(&earlier.interview_sheet, &self.interview_sheet)
            && kept(&earlier.csv_path, &self.csv_path)
            && (earlier.calendar_links.is_empty() || earlier.calendar_links == self.calendar_links)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    run_id: Uuid,
    config: RunConfig,

    pub downloaded: Vec<DocumentRef>,
    pub extracted: Vec<Candidate>,
    pub enriched: Vec<Candidate>,
    pub scored: Vec<Candidate>,
    pub shortlisted: Vec<Candidate>,
    pub rejected: Vec<Candidate>,
    pub scheduled: Vec<Candidate>,

    pub outputs: OutputLocators,
    pub status: PipelineStatus,
    errors: Vec<StageFailure>,
    path: Vec<StageName>,
}

impl PipelineState {
    pub fn new(config: RunConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
            downloaded: Vec::new(),
            extracted: Vec::new(),
            enriched: Vec::new(),
            scored: Vec::new(),
            shortlisted: Vec::new(),
            rejected: Vec::new(),
            scheduled: Vec::new(),
            outputs: OutputLocators::default(),
            status: PipelineStatus::Started,
            errors: Vec::new(),
            path: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn errors(&self) -> &[StageFailure] {
        &self.errors
    }

    /// Stages executed so far, in order.
    pub fn path(&self) -> &[StageName] {
        &self.path
    }

    pub fn record_error(&mut self, stage: StageName, message: impl Into<String>) {
        self.errors.push(StageFailure {
            stage,
            message: message.into(),
        });
    }

    pub(crate) fn enter(&mut self, stage: StageName) {
        self.path.push(stage);
    }

    /// Partition and subset rules that must hold after every stage.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.shortlisted.len() + self.rejected.len() != self.scored.len() {
            return Err(format!(
                "{} shortlisted + {} rejected != {} scored",
                self.shortlisted.len(),
                self.rejected.len(),
                self.scored.len()
            ));
        }

        let mut remaining: HashMap<String, usize> = HashMap::new();
        for candidate in &self.scored {
            *remaining.entry(candidate.identity()).or_default() += 1;
        }
        for candidate in self.shortlisted.iter().chain(&self.rejected) {
            match remaining.get_mut(&candidate.identity()) {
                Some(n) if *n > 0 => *n -= 1,
                _ => return Err(format!("{} is partitioned but was never scored", candidate.identity())),
            }
        }

        let threshold = self.config.min_score_threshold;
        if let Some(c) = self
            .shortlisted
            .iter()
            .find(|c| c.number(keys::SCORE).unwrap_or(f64::NEG_INFINITY) < threshold)
        {
            return Err(format!("{} is shortlisted below the threshold", c.identity()));
        }
        if let Some(c) = self
            .rejected
            .iter()
            .find(|c| c.number(keys::SCORE).unwrap_or(f64::NEG_INFINITY) >= threshold)
        {
            return Err(format!("{} is rejected at or above the threshold", c.identity()));
        }

        let shortlisted: HashSet<String> = self.shortlisted.iter().map(Candidate::identity).collect();
        if let Some(c) = self
            .scheduled
            .iter()
            .find(|c| !shortlisted.contains(&c.identity()))
        {
            return Err(format!("{} is scheduled but not shortlisted", c.identity()));
        }

        Ok(())
    }

    /// Rules relating this state to the one a stage started from.
    pub fn check_preserved(&self, errors_before: &[StageFailure], outputs_before: &OutputLocators) -> Result<(), String> {
        if self.errors.len() < errors_before.len() || self.errors[..errors_before.len()] != *errors_before {
            return Err("recorded errors were removed or rewritten".to_string());
        }
        if !self.outputs.preserves(outputs_before) {
            return Err("an output locator was overwritten".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scored(email: &str, score: f64) -> Candidate {
        Candidate::from_value(json!({"email": email, "score": score})).unwrap()
    }

    #[test]
    fn test_new_state_is_empty_and_started() {
        let state = PipelineState::new(RunConfig::default());
        assert_eq!(state.status, PipelineStatus::Started);
        assert!(state.errors().is_empty());
        assert!(state.path().is_empty());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_locators_are_write_once() {
        let mut outputs = OutputLocators::default();
        assert!(outputs.set_roster_sheet("https://a".to_string()));
        assert!(!outputs.set_roster_sheet("https://b".to_string()));
        assert_eq!(outputs.roster_sheet(), Some("https://a"));

        assert!(outputs.set_calendar_links(vec!["l1".to_string()]));
        assert!(!outputs.set_calendar_links(vec!["l2".to_string()]));
        assert_eq!(outputs.calendar_links(), ["l1".to_string()]);
    }

    #[test]
    fn test_preserves_detects_overwrite() {
        let mut before = OutputLocators::default();
        before.set_csv_path(PathBuf::from("a.csv"));
        let mut after = OutputLocators::default();
        after.set_csv_path(PathBuf::from("b.csv"));
        assert!(!after.preserves(&before));
        assert!(before.preserves(&OutputLocators::default()));
    }

    #[test]
    fn test_invariants_catch_lost_partition_member() {
        let mut state = PipelineState::new(RunConfig::default());
        state.scored = vec![scored("a@x.io", 8.0), scored("b@x.io", 2.0)];
        state.shortlisted = vec![scored("a@x.io", 8.0)];
        assert!(state.check_invariants().is_err());

        state.rejected = vec![scored("b@x.io", 2.0)];
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_invariants_catch_scheduled_outsider() {
        let mut state = PipelineState::new(RunConfig::default());
        state.scored = vec![scored("a@x.io", 8.0)];
        state.shortlisted = state.scored.clone();
        state.scheduled = vec![scored("intruder@x.io", 9.0)];
        let err = state.check_invariants().unwrap_err();
        assert!(err.contains("intruder@x.io"));
    }

    #[test]
    fn test_invariants_catch_misplaced_threshold() {
        let mut state = PipelineState::new(RunConfig::default());
        state.scored = vec![scored("a@x.io", 4.9)];
        state.shortlisted = state.scored.clone();
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn test_errors_are_append_only() {
        let mut state = PipelineState::new(RunConfig::default());
        state.record_error(StageName::Fetch, "mailbox offline");
        let before = state.errors().to_vec();
        let outputs = state.outputs.clone();

        state.record_error(StageName::Score, "boom");
        assert!(state.check_preserved(&before, &outputs).is_ok());
        assert_eq!(state.errors()[1].to_string(), "Scoring: boom");

        let fresh = PipelineState::new(RunConfig::default());
        assert!(fresh.check_preserved(&before, &outputs).is_err());
    }
}
