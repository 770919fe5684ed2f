use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cell grid as returned by the spreadsheet collaborator: first row is the header
pub type Grid = Vec<Vec<Option<String>>>;

/// One sheet row keyed by its (cleaned) header text
pub type SheetRow = BTreeMap<String, Option<String>>;

/// A computer-lab session as recorded by the usage form.
/// Nothing is rejected at this stage; absent columns stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanUsageRecord {
    pub timestamp: Option<String>,
    pub library: Option<String>,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub purpose: Option<String>,
    pub station_id: Option<String>,
    /// Same-day wall-clock difference; `None` when unknown or negative
    pub duration_minutes: Option<i64>,
}
