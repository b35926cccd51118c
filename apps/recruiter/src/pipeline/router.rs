// The one branch in the graph: after scoring, schedule only if someone qualified.

use serde::Serialize;

use crate::pipeline::state::PipelineState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Schedule,
    Skip,
}

impl Route {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Skip => "skip",
        }
    }
}

/// Pure: looks at `shortlisted` and nothing else.
pub fn decide(state: &PipelineState) -> Route {
    if state.shortlisted.is_empty() {
        Route::Skip
    } else {
        Route::Schedule
    }
}
