// Export: spreadsheets through the actions client, plus local artifacts
// (JSON snapshot, interview CSV) under the output directory.

pub mod artifacts;
pub mod rows;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::actions::{
    pick, ActionError, ActionsClient, GOOGLESHEETS_BATCH_UPDATE, GOOGLESHEETS_CREATE_SHEET,
};
use crate::config::Config;

pub use artifacts::ArtifactWriter;
pub use rows::Row;

/// Publishes a table. `rows[0]` is the header. Returns the sheet location,
/// or `None` when there was nothing beyond the header to publish.
#[async_trait]
pub trait SpreadsheetExporter: Send + Sync {
    async fn export(&self, title: &str, rows: Vec<Row>) -> Result<Option<String>, ActionError>;
}

pub struct ActionSheetsExporter {
    actions: ActionsClient,
    entity_id: String,
}

impl ActionSheetsExporter {
    pub fn new(actions: ActionsClient, config: &Config) -> Self {
        Self {
            actions,
            entity_id: config.sheets_entity_id.clone(),
        }
    }
}

#[async_trait]
impl SpreadsheetExporter for ActionSheetsExporter {
    async fn export(&self, title: &str, rows: Vec<Row>) -> Result<Option<String>, ActionError> {
        if rows.len() <= 1 {
            return Ok(None);
        }

        let created = self
            .actions
            .execute(GOOGLESHEETS_CREATE_SHEET, &self.entity_id, json!({ "title": title }))
            .await?;
        let (spreadsheet_id, url) = sheet_location(&created)?;

        let data_rows = rows.len() - 1;
        self.actions
            .execute(
                GOOGLESHEETS_BATCH_UPDATE,
                &self.entity_id,
                json!({
                    "spreadsheet_id": spreadsheet_id,
                    "sheet_name": "Sheet1",
                    "values": rows,
                    "valueInputOption": "RAW",
                }),
            )
            .await?;

        info!(title, rows = data_rows, url = %url, "spreadsheet exported");
        Ok(Some(url))
    }
}

/// Spreadsheet id and browser URL from a create-sheet payload.
fn sheet_location(data: &Value) -> Result<(String, String), ActionError> {
    let id = pick(data, &["spreadsheetId", "spreadsheet_id", "id"])
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ActionError::UnexpectedPayload {
            action: GOOGLESHEETS_CREATE_SHEET.to_string(),
            detail: "no spreadsheet id in response".to_string(),
        })?;
    let url = pick(data, &["spreadsheetUrl", "spreadsheet_url"])
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://docs.google.com/spreadsheets/d/{id}"));
    Ok((id.to_string(), url))
}
