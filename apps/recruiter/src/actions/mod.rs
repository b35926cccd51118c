/// Actions Client — the single point of entry for hosted tool-action calls
/// (mail, spreadsheets, calendar, profile lookup).
///
/// Every integration is expressed as a named action executed on behalf of an
/// entity: `POST {base}/api/v2/actions/{ACTION}/execute`.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

pub const GMAIL_FETCH_EMAILS: &str = "GMAIL_FETCH_EMAILS";
pub const GMAIL_GET_ATTACHMENT: &str = "GMAIL_GET_ATTACHMENT";
pub const LINKEDIN_GET_PROFILE: &str = "LINKEDIN_GET_PROFILE";
pub const GOOGLESHEETS_CREATE_SHEET: &str = "GOOGLESHEETS_CREATE_GOOGLE_SHEET1";
pub const GOOGLESHEETS_BATCH_UPDATE: &str = "GOOGLESHEETS_BATCH_UPDATE";
pub const GOOGLECALENDAR_CREATE_EVENT: &str = "GOOGLECALENDAR_CREATE_EVENT";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Action {action} was not successful: {message}")]
    Unsuccessful { action: String, message: String },

    #[error("Action {action} returned an unexpected payload: {detail}")]
    UnexpectedPayload { action: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gave up after {retries} retries")]
    Exhausted { retries: u32 },
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    #[serde(rename = "entityId")]
    entity_id: &'a str,
    input: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default, alias = "success")]
    successful: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ActionsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ActionsClient {
    pub fn new(base_url: impl Into<String>, api_key: String) -> Result<Self, ActionError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Executes `action` for `entity_id` and returns the `data` payload.
    /// Retries on 429 and 5xx with exponential backoff, like the LLM client.
    pub async fn execute(
        &self,
        action: &str,
        entity_id: &str,
        input: Value,
    ) -> Result<Value, ActionError> {
        let url = format!("{}/api/v2/actions/{action}/execute", self.base_url);
        let body = ExecuteRequest {
            entity_id,
            input: &input,
        };

        let mut last_error: Option<ActionError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(action, attempt, "action call failed, retrying after {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ActionError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(ActionError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ActionError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: ExecuteResponse = response.json().await?;
            debug!(action, successful = parsed.successful, "action executed");
            return unwrap_response(action, parsed);
        }

        Err(last_error.unwrap_or(ActionError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

fn unwrap_response(action: &str, response: ExecuteResponse) -> Result<Value, ActionError> {
    if response.successful {
        Ok(response.data)
    } else {
        Err(ActionError::Unsuccessful {
            action: action.to_string(),
            message: response
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Looks up the first present key among `keys`, descending through a
/// `response_data` wrapper when the action nests its payload.
pub fn pick<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let scopes = [Some(data), data.get("response_data")];
    scopes
        .into_iter()
        .flatten()
        .find_map(|scope| keys.iter().find_map(|k| scope.get(*k)))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_response_successful_returns_data() {
        let resp: ExecuteResponse =
            serde_json::from_value(json!({"successful": true, "data": {"id": 7}})).unwrap();
        assert_eq!(unwrap_response("X", resp).unwrap(), json!({"id": 7}));
    }

    #[test]
    fn test_unwrap_response_accepts_success_alias() {
        let resp: ExecuteResponse =
            serde_json::from_value(json!({"success": true, "data": []})).unwrap();
        assert!(unwrap_response("X", resp).is_ok());
    }

    #[test]
    fn test_unwrap_response_unsuccessful_carries_message() {
        let resp: ExecuteResponse =
            serde_json::from_value(json!({"successful": false, "error": "no auth"})).unwrap();
        let err = unwrap_response("GMAIL_FETCH_EMAILS", resp).unwrap_err();
        assert!(err.to_string().contains("GMAIL_FETCH_EMAILS"));
        assert!(err.to_string().contains("no auth"));
    }

    #[test]
    fn test_pick_prefers_top_level_then_response_data() {
        let data = json!({"response_data": {"htmlLink": "https://cal/1"}});
        assert_eq!(
            pick(&data, &["htmlLink"]).and_then(Value::as_str),
            Some("https://cal/1")
        );
        let data = json!({"spreadsheetUrl": "https://sheet"});
        assert_eq!(
            pick(&data, &["spreadsheetUrl"]).and_then(Value::as_str),
            Some("https://sheet")
        );
    }

    #[test]
    fn test_pick_ignores_null() {
        let data = json!({"spreadsheetUrl": null});
        assert!(pick(&data, &["spreadsheetUrl"]).is_none());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = ActionsClient::new("https://backend.example/", "k".to_string()).unwrap();
        assert_eq!(client.base_url, "https://backend.example");
    }
}
