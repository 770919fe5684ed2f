//! Grouped sums, counts and averages over clean records.
//!
//! Rankings are ordered by value descending with ties broken by label
//! ascending, so repeated requests over the same data agree.

use std::collections::{BTreeMap, HashMap};

use crate::domain::loan::CleanLoanRecord;
use crate::domain::statistics::{
    month_name, LabeledCount, LabeledTotal, LoanStatistics, UsageStatistics, UNSPECIFIED_LABEL,
};
use crate::domain::usage::CleanUsageRecord;

/// Length of the title and program rankings
pub const TOP_RANKING_SIZE: usize = 10;

/// Loan statistics over an in-memory clean set
pub fn loan_statistics(records: &[CleanLoanRecord]) -> LoanStatistics {
    let mut by_library: HashMap<String, i64> = HashMap::new();
    let mut by_year: BTreeMap<i32, i64> = BTreeMap::new();
    let mut by_month: BTreeMap<i32, i64> = BTreeMap::new();
    let mut by_title: HashMap<String, i64> = HashMap::new();
    let mut by_program: HashMap<String, i64> = HashMap::new();
    let mut total_transactions = 0i64;

    for record in records {
        let count = i64::from(record.transaction_count);
        total_transactions += count;

        *by_library.entry(record.library.to_string()).or_default() += count;
        *by_year.entry(record.year).or_default() += count;
        *by_month.entry(record.month).or_default() += count;
        *by_title.entry(record.title.clone()).or_default() += count;
        *by_program.entry(record.program.clone()).or_default() += count;
    }

    LoanStatistics {
        total_records: records.len() as i64,
        total_transactions,
        by_library: rank_totals(by_library, None),
        by_year: by_year
            .into_iter()
            .map(|(year, total)| LabeledTotal::new(year.to_string(), total))
            .collect(),
        by_month: month_totals(by_month),
        top_titles: rank_totals(by_title, Some(TOP_RANKING_SIZE)),
        top_programs: rank_totals(by_program, Some(TOP_RANKING_SIZE)),
    }
}

/// Sort grouped totals descending, label ascending on ties
pub fn rank_totals(
    totals: impl IntoIterator<Item = (String, i64)>,
    limit: Option<usize>,
) -> Vec<LabeledTotal> {
    let mut ranked: Vec<LabeledTotal> = totals
        .into_iter()
        .map(|(label, total)| LabeledTotal::new(label, total))
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.label.cmp(&b.label)));

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

/// Label per-month totals in calendar order; months outside 1..=12 are skipped
pub fn month_totals(totals: impl IntoIterator<Item = (i32, i64)>) -> Vec<LabeledTotal> {
    let mut months: Vec<(i32, i64)> = totals.into_iter().collect();
    months.sort_by_key(|(month, _)| *month);

    months
        .into_iter()
        .filter_map(|(month, total)| month_name(month).map(|name| LabeledTotal::new(name, total)))
        .collect()
}

/// Usage statistics over the sessions read from the sheet
pub fn usage_statistics(records: &[CleanUsageRecord]) -> UsageStatistics {
    let durations: Vec<i64> = records.iter().filter_map(|r| r.duration_minutes).collect();
    let average_duration_minutes = if durations.is_empty() {
        None
    } else {
        let mean = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    UsageStatistics {
        total_sessions: records.len(),
        average_duration_minutes,
        by_user_type: count_by(records, |r| r.user_type.as_deref()),
        by_purpose: count_by(records, |r| r.purpose.as_deref()),
        by_library: count_by(records, |r| r.library.as_deref()),
    }
}

fn count_by<F>(records: &[CleanUsageRecord], field: F) -> Vec<LabeledCount>
where
    F: Fn(&CleanUsageRecord) -> Option<&str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let label = field(record)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNSPECIFIED_LABEL);
        *counts.entry(label).or_default() += 1;
    }

    let mut counted: Vec<LabeledCount> = counts
        .into_iter()
        .map(|(label, count)| LabeledCount {
            label: label.to_string(),
            count,
        })
        .collect();
    counted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    counted
}
