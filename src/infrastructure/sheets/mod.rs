pub mod google;

use crate::domain::error::Result;
use crate::domain::usage::Grid;
use async_trait::async_trait;

pub use google::GoogleSheetsClient;

/// Credentials accepted by the Sheets values API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsCredentials {
    ApiKey(String),
    AccessToken(String),
}

/// Source of spreadsheet cell grids. Failures surface as one error; no retry.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_grid(&self, spreadsheet_id: &str, range: &str) -> Result<Grid>;
}
