use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::router::{decide, Route};
use crate::pipeline::state::{PipelineState, PipelineStatus, StageName};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub downloaded: usize,
    pub extracted: usize,
    pub enriched: usize,
    pub scored: usize,
    pub shortlisted: usize,
    pub rejected: usize,
    pub scheduled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutputs {
    pub json_path: Option<String>,
    pub roster_sheet: Option<String>,
    pub interview_sheet: Option<String>,
    pub csv_path: Option<String>,
    pub calendar_links: Vec<String>,
}

/// Human-facing summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub status: PipelineStatus,
    pub route: Route,
    pub path: Vec<StageName>,
    pub counts: StageCounts,
    pub outputs: ReportOutputs,
    pub errors: Vec<String>,
}

impl PipelineReport {
    pub fn from_state(state: &PipelineState) -> Self {
        let outputs = &state.outputs;
        Self {
            run_id: state.run_id(),
            status: state.status,
            route: decide(state),
            path: state.path().to_vec(),
            counts: StageCounts {
                downloaded: state.downloaded.len(),
                extracted: state.extracted.len(),
                enriched: state.enriched.len(),
                scored: state.scored.len(),
                shortlisted: state.shortlisted.len(),
                rejected: state.rejected.len(),
                scheduled: state.scheduled.len(),
            },
            outputs: ReportOutputs {
                json_path: outputs.json_path().map(|p| p.display().to_string()),
                roster_sheet: outputs.roster_sheet().map(str::to_string),
                interview_sheet: outputs.interview_sheet().map(str::to_string),
                csv_path: outputs.csv_path().map(|p| p.display().to_string()),
                calendar_links: outputs.calendar_links().to_vec(),
            },
            errors: state.errors().iter().map(ToString::to_string).collect(),
        }
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        writeln!(f, "Recruiting pipeline run {}", self.run_id)?;
        writeln!(f, "  route:        {}", self.route.as_str())?;
        writeln!(f, "  resumes:      {} downloaded, {} extracted", c.downloaded, c.extracted)?;
        writeln!(f, "  candidates:   {} enriched, {} scored", c.enriched, c.scored)?;
        writeln!(f, "  shortlisted:  {} ({} rejected)", c.shortlisted, c.rejected)?;
        writeln!(f, "  scheduled:    {}", c.scheduled)?;
        writeln!(f, "Outputs")?;
        writeln!(f, "  enriched json:   {}", or_dash(&self.outputs.json_path))?;
        writeln!(f, "  roster sheet:    {}", or_dash(&self.outputs.roster_sheet))?;
        writeln!(f, "  interview sheet: {}", or_dash(&self.outputs.interview_sheet))?;
        writeln!(f, "  interview csv:   {}", or_dash(&self.outputs.csv_path))?;
        writeln!(f, "  calendar events: {}", self.outputs.calendar_links.len())?;
        if self.errors.is_empty() {
            write!(f, "No errors")
        } else {
            writeln!(f, "Errors ({})", self.errors.len())?;
            for (i, error) in self.errors.iter().enumerate() {
                if i + 1 == self.errors.len() {
                    write!(f, "  - {error}")?;
                } else {
                    writeln!(f, "  - {error}")?;
                }
            }
            Ok(())
        }
    }
}
