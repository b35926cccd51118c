// In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::actions::ActionError;
use crate::enrichment::{Enricher, ProvenanceTag};
use crate::export::{Row, SpreadsheetExporter};
use crate::intake::parser::ParseError;
use crate::intake::{DocumentParser, MailFetcher};
use crate::models::{keys, Candidate, DocumentRef};
use crate::scheduling::InterviewScheduler;
use crate::llm_client::LlmError;
use crate::scoring::{CandidateScorer, ScoreOutcome, ScoringCriteria, ScoringError, ScoringMethod};

fn unavailable(action: &str) -> ActionError {
    ActionError::Unsuccessful {
        action: action.to_string(),
        message: "service unavailable".to_string(),
    }
}

pub struct FakeMail {
    pub documents: Vec<DocumentRef>,
    pub fail: bool,
}

impl FakeMail {
    pub fn with(names: &[&str]) -> Self {
        Self {
            documents: names.iter().map(|n| DocumentRef::new(*n)).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            documents: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl MailFetcher for FakeMail {
    async fn fetch(&self, _max_items: usize) -> Result<Vec<DocumentRef>, ActionError> {
        if self.fail {
            return Err(unavailable("GMAIL_FETCH_EMAILS"));
        }
        Ok(self.documents.clone())
    }
}

/// `<stem>.pdf` parses to a candidate with email `<stem>@example.com`;
/// any file whose stem starts with `bad` is unusable.
pub struct FakeParser;

#[async_trait]
impl DocumentParser for FakeParser {
    async fn parse(&self, document: &DocumentRef) -> Result<Candidate, ParseError> {
        let stem = document
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem.starts_with("bad") {
            return Err(ParseError::Unusable);
        }
        Ok(Candidate::from_value(json!({
            "full_name": stem.to_uppercase(),
            "email": format!("{stem}@example.com"),
            "skills": ["python", "machine learning", "react"],
            "experience": [{"title": "Engineer"}],
            "source_file": document.file_name(),
        }))
        .unwrap_or_default())
    }
}

pub struct TagOnlyEnricher;

#[async_trait]
impl Enricher for TagOnlyEnricher {
    async fn enrich(&self, mut candidate: Candidate) -> Candidate {
        candidate.set(keys::ENRICHMENT_SOURCE, ProvenanceTag::SecondaryOnly.as_str());
        candidate
    }
}

/// Scores by email; unknown emails score 0. `fail` simulates an outage.
pub struct FixedScorer {
    pub scores: HashMap<String, f64>,
    pub fail: bool,
}

impl FixedScorer {
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(e, s)| (e.to_string(), *s)).collect(),
            fail: false,
        }
    }
}

#[async_trait]
impl CandidateScorer for FixedScorer {
    async fn score(
        &self,
        candidate: &Candidate,
        _criteria: &ScoringCriteria,
    ) -> Result<ScoreOutcome, ScoringError> {
        if self.fail {
            return Err(ScoringError::Llm(LlmError::EmptyContent));
        }
        let score = self.scores.get(candidate.email()).copied().unwrap_or(0.0);
        Ok(ScoreOutcome {
            score,
            rationale: format!("fixed score {score}"),
            method: ScoringMethod::Llm,
        })
    }
}

#[derive(Default)]
pub struct FakeScheduler {
    pub bookings: AtomicUsize,
    pub fail: bool,
    /// Adds a record that was never shortlisted.
    pub rogue: bool,
    pub panics: bool,
}

impl FakeScheduler {
    pub fn booked(&self) -> usize {
        self.bookings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewScheduler for FakeScheduler {
    async fn schedule(
        &self,
        candidates: &[Candidate],
        duration_minutes: u32,
    ) -> Result<Vec<Candidate>, ActionError> {
        if self.panics {
            panic!("calendar client crashed");
        }
        if self.fail {
            return Err(unavailable("GOOGLECALENDAR_CREATE_EVENT"));
        }
        let mut out = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            let mut record = candidate.clone();
            if !record.flag(keys::SCHEDULE_CREATED) {
                self.bookings.fetch_add(1, Ordering::SeqCst);
                record.set(keys::INTERVIEW_DATE, "2026-10-20");
                record.set(keys::INTERVIEW_TIME, format!("{:02}:00 AM", 9 + i));
                record.set(keys::DURATION_MINUTES, duration_minutes);
                record.set(keys::SCHEDULE_CREATED, true);
                record.set(keys::CALENDAR_EVENT_LINK, format!("https://calendar/event/{i}"));
            }
            out.push(record);
        }
        if self.rogue {
            out.push(Candidate::from_value(json!({"email": "rogue@example.com"})).unwrap_or_default());
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct FakeSheets {
    pub titles: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl SpreadsheetExporter for FakeSheets {
    async fn export(&self, title: &str, rows: Vec<Row>) -> Result<Option<String>, ActionError> {
        if self.fail {
            return Err(unavailable("GOOGLESHEETS_CREATE_GOOGLE_SHEET1"));
        }
        let mut titles = self.titles.lock().unwrap_or_else(|e| e.into_inner());
        titles.push(title.to_string());
        Ok(Some(format!("https://sheets/{}/{}", titles.len(), rows.len())))
    }
}

/// A structurally valid one-page PDF whose content stream selects a font
/// the page never defines.
pub fn undefined_font_pdf() -> Vec<u8> {
    let content = "BT /F2 12 Tf 72 712 Td (Jane Doe jane@example.com) Tj ET";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}
