use thiserror::Error;

use crate::pipeline::{PipelineState, StageName};

/// Orchestrator-level failures. Anything a single stage can absorb is
/// recorded on the state instead and never shows up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline cannot be built: no {0} configured")]
    MissingCollaborator(&'static str),

    #[error("state invariant violated after {stage}: {reason}")]
    InvariantViolated {
        stage: StageName,
        reason: String,
        /// Last known state, returned instead of a report.
        state: Box<PipelineState>,
    },

    #[error("stage {stage} panicked: {reason}")]
    StagePanicked {
        stage: StageName,
        reason: String,
        /// State as it entered the stage.
        state: Box<PipelineState>,
    },

    #[error("pipeline did not terminate after {steps} transitions")]
    RunawayGraph { steps: usize },
}

impl PipelineError {
    /// The state a run ended with, when it got far enough to have one.
    pub fn last_state(&self) -> Option<&PipelineState> {
        match self {
            Self::InvariantViolated { state, .. } | Self::StagePanicked { state, .. } => {
                Some(state.as_ref())
            }
            Self::MissingCollaborator(_) | Self::RunawayGraph { .. } => None,
        }
    }
}
