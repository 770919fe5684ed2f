// ============================================================
// QUALITY REPORT
// ============================================================
// Accepted/discarded counts and per-row defects of one batch

use serde::{Deserialize, Serialize};

use super::OriginalValues;

/// A discarded row and everything wrong with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// 1-based line number; the header is row 1
    pub row_index: usize,
    pub errors: Vec<String>,
    pub original_values: OriginalValues,
}

/// Summary of how a batch fared under validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub discarded_rows: usize,
    pub inconsistencies: Vec<Inconsistency>,
    /// Percentage of valid rows, one decimal; 0 for an empty batch
    pub quality_percentage: f64,
}

impl QualityReport {
    pub fn new() -> Self {
        Self {
            total_rows: 0,
            valid_rows: 0,
            discarded_rows: 0,
            inconsistencies: Vec::new(),
            quality_percentage: 0.0,
        }
    }

    pub fn record_valid(&mut self) {
        self.total_rows += 1;
        self.valid_rows += 1;
        self.refresh_percentage();
    }

    pub fn record_discarded(&mut self, inconsistency: Inconsistency) {
        self.total_rows += 1;
        self.discarded_rows += 1;
        self.inconsistencies.push(inconsistency);
        self.refresh_percentage();
    }

    fn refresh_percentage(&mut self) {
        self.quality_percentage = if self.total_rows == 0 {
            0.0
        } else {
            round_one_decimal(self.valid_rows as f64 / self.total_rows as f64 * 100.0)
        };
    }

    /// Counts add up and match the number of records actually kept
    pub fn is_consistent_with(&self, clean_count: usize) -> bool {
        self.valid_rows + self.discarded_rows == self.total_rows
            && self.valid_rows == clean_count
            && (self.total_rows > 0 || self.quality_percentage == 0.0)
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} valid, {} discarded ({:.1}% quality)",
            self.total_rows, self.valid_rows, self.discarded_rows, self.quality_percentage
        )
    }
}

impl Default for QualityReport {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
