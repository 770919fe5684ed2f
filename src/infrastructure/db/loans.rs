use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::use_cases::statistics::month_totals;
use crate::domain::error::Result;
use crate::domain::loan::CleanLoanRecord;
use crate::domain::statistics::{LabeledTotal, LoanStatistics};

pub const LOANS_TABLE: &str = "koha_prestamos";

/// Outcome of a bulk insert; failures are counted, not raised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSummary {
    pub inserted: usize,
    pub failed: usize,
}

/// Relational sink for clean circulation records
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn init_schema(&self) -> Result<()>;

    async fn insert(&self, record: &CleanLoanRecord) -> Result<()>;

    /// Insert every record inside one transaction committed at the end.
    /// A failing row is rolled back on its own and the loop carries on.
    async fn insert_all(&self, records: &[CleanLoanRecord]) -> Result<InsertSummary>;

    async fn loan_statistics(&self) -> Result<LoanStatistics>;
}

/// Grouped rows as read back from an aggregate query
pub(crate) struct LoanAggregates {
    pub total_records: i64,
    pub total_transactions: i64,
    pub by_library: Vec<(String, i64)>,
    pub by_year: Vec<(i32, i64)>,
    pub by_month: Vec<(i32, i64)>,
    pub top_titles: Vec<(String, i64)>,
    pub top_programs: Vec<(String, i64)>,
}

impl From<LoanAggregates> for LoanStatistics {
    fn from(rows: LoanAggregates) -> Self {
        let labeled = |rows: Vec<(String, i64)>| -> Vec<LabeledTotal> {
            rows.into_iter()
                .map(|(label, total)| LabeledTotal::new(label, total))
                .collect()
        };

        Self {
            total_records: rows.total_records,
            total_transactions: rows.total_transactions,
            by_library: labeled(rows.by_library),
            by_year: rows
                .by_year
                .into_iter()
                .map(|(year, total)| LabeledTotal::new(year.to_string(), total))
                .collect(),
            by_month: month_totals(rows.by_month),
            top_titles: labeled(rows.top_titles),
            top_programs: labeled(rows.top_programs),
        }
    }
}
