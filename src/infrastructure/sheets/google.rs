use super::{SheetSource, SheetsCredentials};
use crate::domain::error::{AppError, Result};
use crate::domain::usage::Grid;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<SheetsCredentials>,
}

impl GoogleSheetsClient {
    pub fn new(base_url: impl Into<String>, credentials: Option<SheetsCredentials>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
            credentials,
        }
    }

    fn credentials(&self) -> Result<&SheetsCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            AppError::ConfigError(
                "Google Sheets credentials are not configured (google_api_key or google_access_token)"
                    .to_string(),
            )
        })
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| AppError::ConfigError(format!("Invalid sheets_base_url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError("sheets_base_url cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", range]);

        Ok(url)
    }
}

/// Formatted values come back as strings; anything else is stringified
fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn into_grid(range: ValueRange) -> Grid {
    range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn fetch_grid(&self, spreadsheet_id: &str, range: &str) -> Result<Grid> {
        let credentials = self.credentials()?;
        let mut url = self.values_url(spreadsheet_id, range)?;

        let mut request = match credentials {
            SheetsCredentials::ApiKey(key) => {
                url.query_pairs_mut().append_pair("key", key);
                self.client.get(url)
            }
            SheetsCredentials::AccessToken(token) => self.client.get(url).bearer_auth(token),
        };
        request = request.header("Accept", "application/json");

        let response = request.send().await.map_err(|e| {
            error!(spreadsheet_id, error = %e, "Google Sheets request failed");
            AppError::FetchError(format!("Request to Google Sheets failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!(spreadsheet_id, %status, "Google Sheets returned an error");
            return Err(AppError::FetchError(format!(
                "Google Sheets API error ({}): {}",
                status, text
            )));
        }

        let body: ValueRange = response.json().await.map_err(|e| {
            AppError::FetchError(format!("Failed to parse Google Sheets response: {}", e))
        })?;

        let grid = into_grid(body);
        debug!(spreadsheet_id, rows = grid.len(), "Fetched sheet grid");
        Ok(grid)
    }
}
