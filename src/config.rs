use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::PipelineError;
use crate::publish::auth::ServiceAccountKey;

/// Where to look for report exports and what they look like.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory scanned for exports (non-recursive).
    pub dir: PathBuf,
    /// File extension of the export, without the dot.
    pub extension: String,
}

impl ReportConfig {
    /// `REPORT_DIR` / `REPORT_EXT`, defaulting to the current directory and `xls`.
    pub fn from_env() -> Self {
        let dir = env::var("REPORT_DIR").unwrap_or_else(|_| ".".into());
        let extension = env::var("REPORT_EXT").unwrap_or_else(|_| "xls".into());
        Self {
            dir: PathBuf::from(dir),
            extension,
        }
    }
}

/// Everything the publisher needs, resolved up front so that a missing
/// credential aborts the run before any network call is made.
#[derive(Debug)]
pub struct PublishConfig {
    pub credentials: ServiceAccountKey,
    pub spreadsheet_id: String,
}

impl PublishConfig {
    /// Reads `GGL_CREDENTIALS` (service-account key JSON) and `SHEET_ID`.
    pub fn from_env() -> Result<Self> {
        let creds_json =
            env::var("GGL_CREDENTIALS").map_err(|_| PipelineError::ConfigMissing("GGL_CREDENTIALS"))?;
        let credentials: ServiceAccountKey = serde_json::from_str(&creds_json)
            .context("GGL_CREDENTIALS is not a valid service-account key")?;
        let spreadsheet_id =
            env::var("SHEET_ID").map_err(|_| PipelineError::ConfigMissing("SHEET_ID"))?;
        Ok(Self {
            credentials,
            spreadsheet_id,
        })
    }
}
