//! Tempoflow Sheets - Status Record Store
//!
//! The status-store collaborator: one spreadsheet row per profile, with
//! independent step-status columns and an overall-status column. Implements
//! the core's [`StatusStore`] over the Google Sheets values REST API.
//!
//! Writes touch single cells, keyed by the task's row handle, so concurrent
//! profile runs never contend on the same record.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempoflow_core::{
    OverallStatus, ProfileTask, Result as CoreResult, RowHandle, StatusStore, StepName, StepStatus,
};
use tracing::{debug, info, warn};

pub use error::{Error, Result};

/// Store cell written while a profile is being processed.
const IN_PROGRESS_CELL: &str = "IN PROGRESS";

/// Spreadsheet and column layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet id
    #[serde(default)]
    pub sheet_id: String,

    /// Worksheet (tab) name
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// OAuth bearer token for the Sheets API
    #[serde(default)]
    pub access_token: String,

    /// API base URL; overridable for testing against a stub
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Zero-based column of the profile serial number
    #[serde(default)]
    pub serial_col: usize,

    /// Zero-based column of the AddFunds status
    #[serde(default = "default_add_funds_col")]
    pub add_funds_col: usize,

    /// Zero-based column of the FeeToken status
    #[serde(default = "default_fee_token_col")]
    pub fee_token_col: usize,

    /// Zero-based column of the GM status
    #[serde(default = "default_gm_col")]
    pub gm_col: usize,

    /// Zero-based column of the overall status
    #[serde(default = "default_overall_col")]
    pub overall_col: usize,

    /// Zero-based column of the last-update timestamp
    #[serde(default = "default_timestamp_col")]
    pub timestamp_col: usize,

    /// Header rows to skip when reading
    #[serde(default = "default_header_rows")]
    pub header_rows: u32,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            sheet_name: default_sheet_name(),
            access_token: String::new(),
            api_base: default_api_base(),
            serial_col: 0,
            add_funds_col: default_add_funds_col(),
            fee_token_col: default_fee_token_col(),
            gm_col: default_gm_col(),
            overall_col: default_overall_col(),
            timestamp_col: default_timestamp_col(),
            header_rows: default_header_rows(),
        }
    }
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

fn default_add_funds_col() -> usize {
    1
}

fn default_fee_token_col() -> usize {
    2
}

fn default_gm_col() -> usize {
    3
}

fn default_overall_col() -> usize {
    4
}

fn default_timestamp_col() -> usize {
    5
}

fn default_header_rows() -> u32 {
    1
}

impl SheetsConfig {
    /// Column for one step's status.
    #[must_use]
    pub fn step_col(&self, step: StepName) -> usize {
        match step {
            StepName::AddFunds => self.add_funds_col,
            StepName::FeeToken => self.fee_token_col,
            StepName::Gm => self.gm_col,
        }
    }

    /// Validate the settings needed before any profile runs.
    pub fn validate(&self) -> Result<()> {
        if self.sheet_id.is_empty() {
            return Err(Error::Auth("sheet_id is not set".to_string()));
        }
        if self.access_token.is_empty() {
            return Err(Error::Auth("access_token is not set".to_string()));
        }
        Ok(())
    }
}

/// Convert a zero-based column index to its A1 letter form.
#[must_use]
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ascii letters")
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Google-Sheets-backed [`StatusStore`].
pub struct SheetsStore {
    config: SheetsConfig,
    http: reqwest::Client,
}

impl SheetsStore {
    /// Store over the given settings.
    pub fn new(config: SheetsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { config, http })
    }

    /// The settings this store was built with.
    #[must_use]
    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.config.api_base, self.config.sheet_id, range
        )
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .http
            .get(self.values_url(range))
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("access token rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::Api(format!("read failed: {}", response.status())));
        }
        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| Error::Malformed(e.to_string()))?;
        Ok(body.values)
    }

    async fn write_cell(&self, row: u32, col: usize, value: &str) -> Result<()> {
        let range = format!(
            "{}!{}{}",
            self.config.sheet_name,
            column_letter(col),
            row
        );
        let url = format!("{}?valueInputOption=RAW", self.values_url(&range));
        let body = serde_json::json!({ "values": [[value]] });

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("access token rejected".to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "write to {range} failed: {}",
                response.status()
            )));
        }
        debug!(range = %range, value, "cell written");
        Ok(())
    }

    async fn stamp(&self, row: u32) {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        if let Err(e) = self.write_cell(row, self.config.timestamp_col, &now).await {
            warn!(row, error = %e, "timestamp write failed");
        }
    }

    fn parse_row(&self, row_number: u32, row: &[String]) -> Option<ProfileTask> {
        let serial_cell = row.get(self.config.serial_col)?;
        let serial_number: u32 = match serial_cell.trim().parse() {
            Ok(serial) => serial,
            Err(_) => {
                if !serial_cell.trim().is_empty() {
                    warn!(row = row_number, cell = %serial_cell, "skipping row with bad serial");
                }
                return None;
            }
        };

        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");
        let mut task = ProfileTask::new(serial_number, RowHandle(row_number));
        for step in StepName::ALL {
            task.step_status
                .insert(step, StepStatus::from_cell(cell(self.config.step_col(step))));
        }
        task.overall_status = OverallStatus::from_cell(cell(self.config.overall_col));
        Some(task)
    }
}

#[async_trait]
impl StatusStore for SheetsStore {
    async fn read_tasks(&self) -> CoreResult<Vec<ProfileTask>> {
        let first_data_row = self.config.header_rows + 1;
        let range = format!("{}!A{}:Z", self.config.sheet_name, first_data_row);
        let rows = self.read_range(&range).await.map_err(Into::<tempoflow_core::Error>::into)?;

        let mut tasks = Vec::new();
        for (offset, row) in rows.iter().enumerate() {
            let row_number = first_data_row + offset as u32;
            if let Some(task) = self.parse_row(row_number, row) {
                tasks.push(task);
            }
        }
        info!(count = tasks.len(), "tasks read from sheet");
        Ok(tasks)
    }

    async fn write_step_status(
        &self,
        row: &RowHandle,
        step: StepName,
        status: StepStatus,
    ) -> CoreResult<()> {
        let col = self.config.step_col(step);
        self.write_cell(row.0, col, &status.to_cell())
            .await
            .map_err(Into::<tempoflow_core::Error>::into)?;
        info!(row = row.0, step = %step, status = %status.to_cell(), "step status written");
        Ok(())
    }

    async fn write_overall_status(&self, row: &RowHandle, status: OverallStatus) -> CoreResult<()> {
        self.write_cell(row.0, self.config.overall_col, &status.to_cell())
            .await
            .map_err(Into::<tempoflow_core::Error>::into)?;
        self.stamp(row.0).await;
        info!(row = row.0, status = %status.to_cell(), "overall status written");
        Ok(())
    }

    async fn mark_in_progress(&self, row: &RowHandle) -> CoreResult<()> {
        self.write_cell(row.0, self.config.overall_col, IN_PROGRESS_CELL)
            .await
            .map_err(Into::<tempoflow_core::Error>::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(4), "E");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }

    #[test]
    fn test_validate_requires_sheet_and_token() {
        let config = SheetsConfig::default();
        assert!(config.validate().is_err());

        let config = SheetsConfig {
            sheet_id: "abc".into(),
            access_token: "token".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_row_reads_statuses_and_row_handle() {
        let store = SheetsStore::new(SheetsConfig::default()).unwrap();
        let row = vec![
            "17".to_string(),
            "OK".to_string(),
            "FAILED: popup timeout".to_string(),
            "".to_string(),
            "ERROR: something".to_string(),
        ];
        let task = store.parse_row(4, &row).unwrap();
        assert_eq!(task.serial_number, 17);
        assert_eq!(task.row, RowHandle(4));
        assert_eq!(task.status_of(StepName::AddFunds), StepStatus::Ok);
        assert_eq!(
            task.status_of(StepName::FeeToken),
            StepStatus::Failed(Some("popup timeout".into()))
        );
        assert_eq!(task.status_of(StepName::Gm), StepStatus::Pending);
        assert!(task.is_pending());
    }

    #[test]
    fn test_parse_row_skips_non_numeric_serials() {
        let store = SheetsStore::new(SheetsConfig::default()).unwrap();
        assert!(store.parse_row(2, &["Serial".to_string()]).is_none());
        assert!(store.parse_row(3, &["".to_string()]).is_none());
    }

    #[test]
    fn test_short_rows_read_as_pending() {
        let store = SheetsStore::new(SheetsConfig::default()).unwrap();
        let task = store.parse_row(9, &["21".to_string()]).unwrap();
        for step in StepName::ALL {
            assert_eq!(task.status_of(step), StepStatus::Pending);
        }
        assert!(task.needed_steps().contains(StepName::Gm));
    }
}
