// Intake: getting resume documents into the inbox directory and turning them
// into candidate records. Mail access goes through the actions client only.

pub mod parser;
pub mod prompts;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::actions::{ActionError, ActionsClient, GMAIL_FETCH_EMAILS, GMAIL_GET_ATTACHMENT};
use crate::config::Config;
use crate::models::{DocumentKind, DocumentRef};

pub use parser::{DocumentParser, ResumeParser};

/// Pulls resume attachments out of a mailbox into the inbox directory.
/// "Nothing new" is an empty list, never an error.
#[async_trait]
pub trait MailFetcher: Send + Sync {
    async fn fetch(&self, max_items: usize) -> Result<Vec<DocumentRef>, ActionError>;
}

pub struct ActionMailFetcher {
    actions: ActionsClient,
    entity_id: String,
    inbox_dir: PathBuf,
}

impl ActionMailFetcher {
    pub fn new(actions: ActionsClient, config: &Config) -> Self {
        Self {
            actions,
            entity_id: config.gmail_entity_id.clone(),
            inbox_dir: config.resume_dir.clone(),
        }
    }

    async fn download(
        &self,
        message_id: &str,
        attachment: &PdfAttachment,
    ) -> Result<DocumentRef, ActionError> {
        let target = self.inbox_dir.join(&attachment.file_name);
        if target.exists() {
            debug!(file = %target.display(), "attachment already downloaded");
            return Ok(DocumentRef::new(target));
        }

        let data = self
            .actions
            .execute(
                GMAIL_GET_ATTACHMENT,
                &self.entity_id,
                json!({
                    "message_id": message_id,
                    "attachment_id": attachment.attachment_id,
                    "file_name": attachment.file_name,
                }),
            )
            .await?;

        // The action either stages the file locally or returns it inline.
        if let Some(staged) = data.get("file").and_then(Value::as_str).filter(|p| !p.is_empty()) {
            let staged = Path::new(staged);
            if staged.exists() {
                if std::fs::rename(staged, &target).is_err() {
                    std::fs::copy(staged, &target)?;
                }
                return Ok(DocumentRef::new(target));
            }
        }

        let encoded = data
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::UnexpectedPayload {
                action: GMAIL_GET_ATTACHMENT.to_string(),
                detail: "neither a staged file nor inline data".to_string(),
            })?;
        let bytes = decode_attachment(encoded).ok_or_else(|| ActionError::UnexpectedPayload {
            action: GMAIL_GET_ATTACHMENT.to_string(),
            detail: "attachment data is not valid base64".to_string(),
        })?;
        std::fs::write(&target, bytes)?;
        Ok(DocumentRef::new(target))
    }
}

#[async_trait]
impl MailFetcher for ActionMailFetcher {
    async fn fetch(&self, max_items: usize) -> Result<Vec<DocumentRef>, ActionError> {
        std::fs::create_dir_all(&self.inbox_dir)?;

        let data = self
            .actions
            .execute(
                GMAIL_FETCH_EMAILS,
                &self.entity_id,
                json!({ "max_results": max_items, "query": "has:attachment" }),
            )
            .await?;

        let messages = data
            .get("messages")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut downloaded = Vec::new();
        for message in &messages {
            let Some(message_id) = message.get("messageId").and_then(Value::as_str) else {
                continue;
            };
            for attachment in pdf_attachments(message) {
                match self.download(message_id, &attachment).await {
                    Ok(doc) => downloaded.push(doc),
                    // One bad attachment should not cost the rest of the inbox.
                    Err(e) => warn!(
                        message_id,
                        file = %attachment.file_name,
                        "attachment download failed: {e}"
                    ),
                }
            }
        }

        info!(
            messages = messages.len(),
            downloaded = downloaded.len(),
            "mailbox scan finished"
        );
        Ok(downloaded)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PdfAttachment {
    attachment_id: String,
    file_name: String,
}

fn pdf_attachments(message: &Value) -> Vec<PdfAttachment> {
    message
        .get("attachmentList")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|att| {
                    let file_name = safe_file_name(att.get("filename")?.as_str()?)?;
                    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
                        return None;
                    }
                    Some(PdfAttachment {
                        attachment_id: att.get("attachmentId")?.as_str()?.to_string(),
                        file_name,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Strips any directory components a sender may have put in the name.
fn safe_file_name(raw: &str) -> Option<String> {
    Path::new(raw.trim())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

fn decode_attachment(encoded: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .ok()
}

/// Resume documents already sitting in `dir`, sorted by name, at most `max_items`.
/// A missing directory is an empty inbox.
pub fn scan_directory(dir: &Path, max_items: usize) -> Vec<DocumentRef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), "inbox not readable: {e}");
            return Vec::new();
        }
    };

    let mut documents: Vec<DocumentRef> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .map(DocumentRef::new)
        .filter(|doc| doc.kind != DocumentKind::Unsupported)
        .collect();
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    documents.truncate(max_items);
    documents
}
