use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::PublishConfig;
use crate::error::PipelineError;
use crate::report::NormalizedReport;

use super::auth;
use super::retry::retry_api_call;

/// The one worksheet this crate owns inside the target spreadsheet.
pub const WORKSHEET: &str = "data";

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Authenticated handle on the target spreadsheet.
pub struct SheetsClient {
    http: Client,
    token: String,
    spreadsheet_id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl SheetsClient {
    /// Authenticates and checks that the spreadsheet and the [`WORKSHEET`]
    /// worksheet are reachable. Touches no remote state.
    pub async fn connect(cfg: &PublishConfig) -> Result<Self> {
        let http = Client::new();
        let token = auth::fetch_access_token(&http, &cfg.credentials).await?;
        let client = Self {
            http,
            token,
            spreadsheet_id: cfg.spreadsheet_id.clone(),
        };
        client.verify_worksheet(WORKSHEET).await?;
        Ok(client)
    }

    async fn verify_worksheet(&self, title: &str) -> Result<()> {
        let url = format!(
            "{API_BASE}/{}?fields=sheets.properties.title",
            self.spreadsheet_id
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("spreadsheet metadata request failed")?;
        if !resp.status().is_success() {
            return Err(PipelineError::RemoteAccess(format!(
                "spreadsheet {} returned HTTP {}",
                self.spreadsheet_id,
                resp.status()
            ))
            .into());
        }
        let meta: SpreadsheetMeta = resp.json().await.context("malformed spreadsheet metadata")?;
        if meta.sheets.iter().any(|s| s.properties.title == title) {
            Ok(())
        } else {
            Err(PipelineError::RemoteAccess(format!(
                "worksheet {title:?} not found in spreadsheet {}",
                self.spreadsheet_id
            ))
            .into())
        }
    }

    async fn clear(&self, title: &str) -> Result<()> {
        let url = format!("{API_BASE}/{}/values/{title}:clear", self.spreadsheet_id);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await
            .context("clear request failed")?;
        check_status(resp.status())
    }

    async fn write_rows(&self, title: &str, values: &[Vec<String>]) -> Result<()> {
        let url = format!(
            "{API_BASE}/{}/values/{title}?valueInputOption=RAW",
            self.spreadsheet_id
        );
        let body = json!({
            "range": title,
            "majorDimension": "ROWS",
            "values": values,
        });
        let resp = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("update request failed")?;
        check_status(resp.status())
    }

    /// Wholesale overwrite of the worksheet: clear, then one bulk write under
    /// the retry wrapper. The two calls are not atomic, so an external reader
    /// can observe an empty sheet in between.
    pub async fn publish(&self, report: &NormalizedReport) -> Result<()> {
        let rows = report.to_rows();
        info!(rows = rows.len(), "clearing existing data");
        self.clear(WORKSHEET).await?;
        info!("uploading new data");
        retry_api_call(|| self.write_rows(WORKSHEET, &rows)).await?;
        info!("sheet updated successfully");
        Ok(())
    }
}

/// Splits API statuses into retryable and terminal: only HTTP 500 counts as
/// transient.
fn check_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return Err(PipelineError::Transient {
            status: status.as_u16(),
        }
        .into());
    }
    Err(anyhow!("Sheets API returned HTTP {status}"))
}
