//! Pipeline orchestrator: a fixed graph of stages driven as a state machine.
//!
//! ```text
//! fetch → extract → enrich → score ─┬─ schedule ─┬→ export_all → export_shortlist → report
//!                                   └────────────┘
//! ```
//!
//! The only branch is after scoring (see [`router::decide`]). Stage-local
//! failures are recorded on the state and the run continues; only a broken
//! invariant or a graph that fails to terminate ends a run early.

#[cfg(test)]
pub mod fakes;
pub mod report;
pub mod router;
pub mod stages;
pub mod state;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, info_span, Instrument};

use crate::enrichment::Enricher;
use crate::errors::PipelineError;
use crate::export::{ArtifactWriter, SpreadsheetExporter};
use crate::intake::{DocumentParser, MailFetcher};
use crate::scheduling::InterviewScheduler;
use crate::scoring::CandidateScorer;

pub use report::PipelineReport;
pub use router::{decide, Route};
pub use stages::PipelineSettings;
pub use state::{PipelineState, RunConfig, StageName};

use stages::Stages;

/// The next stage after `current`, or `None` once the terminal stage has run.
pub fn transition(current: StageName, state: &PipelineState) -> Option<StageName> {
    match current {
        StageName::Fetch => Some(StageName::Extract),
        StageName::Extract => Some(StageName::Enrich),
        StageName::Enrich => Some(StageName::Score),
        StageName::Score => Some(match decide(state) {
            Route::Schedule => StageName::Schedule,
            Route::Skip => StageName::ExportAll,
        }),
        StageName::Schedule => Some(StageName::ExportAll),
        StageName::ExportAll => Some(StageName::ExportShortlist),
        StageName::ExportShortlist => Some(StageName::Report),
        StageName::Report => None,
    }
}

pub struct Orchestrator {
    stages: Stages,
}

impl Orchestrator {
    pub fn builder(settings: PipelineSettings) -> PipelineBuilder {
        PipelineBuilder::new(settings)
    }

    /// Drives `initial` from the entry stage to the report.
    pub async fn run(&self, initial: PipelineState) -> Result<PipelineState, PipelineError> {
        let mut state = initial;
        let mut current = Some(StageName::Fetch);
        let mut steps = 0usize;

        info!(
            run_id = %state.run_id(),
            check_mail = state.config().check_mail,
            max_items = state.config().max_items,
            min_score = state.config().min_score_threshold,
            "pipeline started"
        );

        while let Some(stage) = current {
            steps += 1;
            if steps > StageName::ALL.len() {
                return Err(PipelineError::RunawayGraph { steps });
            }

            let errors_before = state.errors().to_vec();
            let outputs_before = state.outputs.clone();
            let span = info_span!("stage", stage = %stage, run_id = %state.run_id());

            state.enter(stage);
            let last_known = state.clone();
            state = match AssertUnwindSafe(self.stages.run(stage, state).instrument(span))
                .catch_unwind()
                .await
            {
                Ok(next) => next,
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    error!(%stage, %reason, "stage panicked");
                    return Err(PipelineError::StagePanicked {
                        stage,
                        reason,
                        state: Box::new(last_known),
                    });
                }
            };

            if let Err(reason) = state
                .check_invariants()
                .and_then(|()| state.check_preserved(&errors_before, &outputs_before))
            {
                error!(%stage, %reason, "pipeline state invariant violated");
                return Err(PipelineError::InvariantViolated {
                    stage,
                    reason,
                    state: Box::new(state),
                });
            }

            current = transition(stage, &state);
        }

        Ok(state)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

pub struct PipelineBuilder {
    settings: PipelineSettings,
    mail: Option<Arc<dyn MailFetcher>>,
    parser: Option<Arc<dyn DocumentParser>>,
    enricher: Option<Arc<dyn Enricher>>,
    scorer: Option<Arc<dyn CandidateScorer>>,
    scheduler: Option<Arc<dyn InterviewScheduler>>,
    sheets: Option<Arc<dyn SpreadsheetExporter>>,
}

impl PipelineBuilder {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            mail: None,
            parser: None,
            enricher: None,
            scorer: None,
            scheduler: None,
            sheets: None,
        }
    }

    pub fn with_mail_fetcher(mut self, mail: Arc<dyn MailFetcher>) -> Self {
        self.mail = Some(mail);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn CandidateScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn InterviewScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_spreadsheet_exporter(mut self, sheets: Arc<dyn SpreadsheetExporter>) -> Self {
        self.sheets = Some(sheets);
        self
    }

    pub fn build(self) -> Result<Orchestrator, PipelineError> {
        let artifacts = ArtifactWriter::new(self.settings.output_dir.clone());
        let stages = Stages {
            mail: self.mail.ok_or(PipelineError::MissingCollaborator("mail fetcher"))?,
            parser: self.parser.ok_or(PipelineError::MissingCollaborator("document parser"))?,
            enricher: self.enricher.ok_or(PipelineError::MissingCollaborator("enricher"))?,
            scorer: self.scorer.ok_or(PipelineError::MissingCollaborator("candidate scorer"))?,
            scheduler: self
                .scheduler
                .ok_or(PipelineError::MissingCollaborator("interview scheduler"))?,
            sheets: self
                .sheets
                .ok_or(PipelineError::MissingCollaborator("spreadsheet exporter"))?,
            artifacts,
            settings: self.settings,
        };
        Ok(Orchestrator { stages })
    }
}
