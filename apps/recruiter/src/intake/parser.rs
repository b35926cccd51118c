//! Resume parser: document text extraction plus LLM structuring.
//!
//! Without an LLM the parser falls back to a line-based heuristic that only
//! recovers contact details and an explicit skills line.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::intake::prompts::{RESUME_PARSE_PROMPT, RESUME_PARSE_SYSTEM};
use crate::llm_client::prompts::fill;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::{keys, Candidate, DocumentKind, DocumentRef};

/// Prompt budget for resume text; long CVs are cut, not rejected.
const MAX_RESUME_CHARS: usize = 12_000;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported document type")]
    Unsupported,

    #[error("could not read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not extract PDF text: {0}")]
    Pdf(String),

    #[error("document contains no text")]
    EmptyText,

    #[error("LLM parsing failed: {0}")]
    Llm(#[from] LlmError),

    #[error("no name or email could be recovered")]
    Unusable,
}

/// Turns one document into a candidate record, or reports why it cannot.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, document: &DocumentRef) -> Result<Candidate, ParseError>;
}

pub struct ResumeParser {
    llm: Option<LlmClient>,
}

impl ResumeParser {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DocumentParser for ResumeParser {
    async fn parse(&self, document: &DocumentRef) -> Result<Candidate, ParseError> {
        let text = read_text(document).await?;
        let text = truncate_chars(&text, MAX_RESUME_CHARS);

        let (mut candidate, source) = match &self.llm {
            Some(llm) => {
                let file_name = document.file_name();
                let prompt = fill(
                    RESUME_PARSE_PROMPT,
                    &[("file_name", file_name.as_str()), ("resume_text", text)],
                );
                let value: Value = llm.call_json(&prompt, RESUME_PARSE_SYSTEM).await?;
                let candidate = Candidate::from_value(value).ok_or(ParseError::Unusable)?;
                (candidate, "llm_parse")
            }
            None => (heuristic_parse(text), "heuristic_parse"),
        };

        if candidate.email().is_empty() && candidate.name() == "Unknown" {
            return Err(ParseError::Unusable);
        }

        candidate.set(keys::SOURCE_FILE, document.file_name());
        candidate.set("parse_method", source);
        debug!(file = %document.file_name(), name = candidate.name(), "resume parsed");
        Ok(candidate)
    }
}

async fn read_text(document: &DocumentRef) -> Result<String, ParseError> {
    let text = match document.kind {
        DocumentKind::Pdf => extract_pdf_text(document.path.clone()).await?,
        DocumentKind::Text => std::fs::read_to_string(&document.path)?,
        DocumentKind::Unsupported => return Err(ParseError::Unsupported),
    };
    if text.trim().is_empty() {
        return Err(ParseError::EmptyText);
    }
    Ok(text)
}

/// The PDF extractor panics on some malformed files (undefined fonts,
/// dangling references). It runs on the blocking pool so a panic comes
/// back as a `JoinError` for this one document.
async fn extract_pdf_text(path: PathBuf) -> Result<String, ParseError> {
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path)).await {
        Ok(extracted) => extracted.map_err(|e| ParseError::Pdf(e.to_string())),
        Err(e) if e.is_panic() => Err(ParseError::Pdf("malformed PDF, extractor aborted".to_string())),
        Err(e) => Err(ParseError::Pdf(e.to_string())),
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Contact details and a "Skills:" line, recovered without a model.
fn heuristic_parse(text: &str) -> Candidate {
    let mut fields = Map::new();
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if let Some(name) = lines
        .iter()
        .find(|l| l.chars().count() <= 60 && !l.contains('@') && l.chars().any(char::is_alphabetic))
    {
        fields.insert(keys::FULL_NAME.into(), Value::String((*name).to_string()));
    }

    let tokens = || text.split_whitespace().map(|t| t.trim_matches(|c: char| ",;()<>|".contains(c)));

    if let Some(email) = tokens().find(|t| looks_like_email(t)) {
        fields.insert(keys::EMAIL.into(), Value::String(email.to_string()));
    }
    if let Some(url) = tokens().find(|t| t.contains("linkedin.com/")) {
        fields.insert(keys::LINKEDIN_URL.into(), Value::String(url.to_string()));
    }

    if let Some(skills) = lines.iter().find_map(|l| {
        let lower = l.to_ascii_lowercase();
        lower
            .strip_prefix("skills:")
            .map(|_| l["skills:".len()..].to_string())
    }) {
        let skills: Vec<Value> = skills
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        fields.insert(keys::SKILLS.into(), Value::Array(skills));
    }

    Candidate::from(fields)
}

fn looks_like_email(token: &str) -> bool {
    match token.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fakes::undefined_font_pdf;

    const PLAIN_RESUME: &str = "
        Jane Doe
        Senior Data Engineer | jane.doe@example.com | (555) 010-2030
        https://www.linkedin.com/in/janedoe
        Skills: Python, SQL; Spark | Airflow
        Experience
        Data Engineer at Acme (2019-2024)
    ";

    #[test]
    fn test_heuristic_parse_recovers_contact_and_skills() {
        let c = heuristic_parse(PLAIN_RESUME);
        assert_eq!(c.name(), "Jane Doe");
        assert_eq!(c.email(), "jane.doe@example.com");
        assert_eq!(
            c.str_or(keys::LINKEDIN_URL, ""),
            "https://www.linkedin.com/in/janedoe"
        );
        assert_eq!(c.list(keys::SKILLS), vec!["Python", "SQL", "Spark", "Airflow"]);
    }

    #[test]
    fn test_heuristic_parse_without_skills_line() {
        let c = heuristic_parse("John Smith\njohn@smith.io");
        assert!(c.list(keys::SKILLS).is_empty());
        assert_eq!(c.email(), "john@smith.io");
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@localhost"));
        assert!(!looks_like_email("a@b."));
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[tokio::test]
    async fn test_parse_text_resume_without_llm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jane.txt");
        std::fs::write(&path, PLAIN_RESUME).unwrap();

        let parser = ResumeParser::new(None);
        let c = parser.parse(&DocumentRef::new(&path)).await.unwrap();
        assert_eq!(c.email(), "jane.doe@example.com");
        assert_eq!(c.str_or(keys::SOURCE_FILE, ""), "jane.txt");
        assert_eq!(c.str_or("parse_method", ""), "heuristic_parse");
    }

    #[tokio::test]
    async fn test_parse_rejects_unsupported_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("cv.docx");
        std::fs::write(&docx, "x").unwrap();
        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "   \n").unwrap();

        let parser = ResumeParser::new(None);
        assert!(matches!(
            parser.parse(&DocumentRef::new(&docx)).await,
            Err(ParseError::Unsupported)
        ));
        assert!(matches!(
            parser.parse(&DocumentRef::new(&blank)).await,
            Err(ParseError::EmptyText)
        ));
    }

    #[tokio::test]
    async fn test_malformed_pdf_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, undefined_font_pdf()).unwrap();

        let parser = ResumeParser::new(None);
        assert!(matches!(
            parser.parse(&DocumentRef::new(&path)).await,
            Err(ParseError::Pdf(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_without_identity_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.txt");
        std::fs::write(&path, "12345\n----").unwrap();

        let parser = ResumeParser::new(None);
        assert!(matches!(
            parser.parse(&DocumentRef::new(&path)).await,
            Err(ParseError::Unusable)
        ));
    }
}
