use serde::{Deserialize, Serialize};

/// Three-letter month labels, January first
pub const MONTH_NAMES: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Bucket used for sessions with an empty categorical value
pub const UNSPECIFIED_LABEL: &str = "Sin especificar";

/// Label for a 1-based month number, `None` outside 1..=12
pub fn month_name(month: i32) -> Option<&'static str> {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|idx| MONTH_NAMES.get(idx).copied())
}

/// A grouped sum of transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledTotal {
    pub label: String,
    pub total: i64,
}

impl LabeledTotal {
    pub fn new(label: impl Into<String>, total: i64) -> Self {
        Self {
            label: label.into(),
            total,
        }
    }
}

/// Aggregate view over persisted circulation records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanStatistics {
    pub total_records: i64,
    pub total_transactions: i64,
    /// Descending by total
    pub by_library: Vec<LabeledTotal>,
    /// Ascending by year
    pub by_year: Vec<LabeledTotal>,
    /// Calendar order, only months with data
    pub by_month: Vec<LabeledTotal>,
    pub top_titles: Vec<LabeledTotal>,
    pub top_programs: Vec<LabeledTotal>,
}

/// A categorical value and how many sessions carry it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCount {
    pub label: String,
    pub count: usize,
}

/// Aggregate view over computer-lab sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStatistics {
    pub total_sessions: usize,
    pub average_duration_minutes: Option<f64>,
    pub by_user_type: Vec<LabeledCount>,
    pub by_purpose: Vec<LabeledCount>,
    pub by_library: Vec<LabeledCount>,
}
