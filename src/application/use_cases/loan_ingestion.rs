// ============================================================
// LOAN INGESTION USE CASE
// ============================================================
// Decode a Koha export, validate every row, report on quality

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::use_cases::row_validator::{RowOutcome, RowValidator};
use crate::domain::error::AppError;
use crate::domain::loan::{CleanLoanRecord, IngestionConfig, QualityReport};
use crate::infrastructure::csv::{decode_payload, CsvParser};

/// Output of one batch: the clean set, its quality report and a preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionResult {
    pub clean_records: Vec<CleanLoanRecord>,
    pub report: QualityReport,
    /// First accepted records, informational only
    pub preview: Vec<CleanLoanRecord>,
}

/// Loan batch ingestion use case
pub struct LoanIngestion {
    config: IngestionConfig,
    validator: RowValidator,
}

impl LoanIngestion {
    /// Create a new ingestion use case
    pub fn new(config: IngestionConfig) -> Self {
        let validator = RowValidator::new(config.clone());
        Self { config, validator }
    }

    /// Process a raw CSV payload
    pub fn process(&self, payload: &[u8]) -> Result<IngestionResult, AppError> {
        let start = Instant::now();

        self.config.validate().map_err(|e| {
            AppError::ValidationError(format!("Invalid ingestion config: {}", e))
        })?;

        let decoded = decode_payload(payload);
        debug!(encoding = %decoded.encoding, bytes = payload.len(), "Decoded CSV payload");

        let rows = CsvParser::new().parse_loan_rows(&decoded.text)?;

        let mut report = QualityReport::new();
        let mut clean_records = Vec::new();

        // Line 1 is the header
        for (row_index, row) in (2..).zip(rows.iter()) {
            match self.validator.validate(row, row_index) {
                RowOutcome::Accepted(record) => {
                    report.record_valid();
                    clean_records.push(record);
                }
                RowOutcome::Rejected(inconsistency) => {
                    debug!(
                        row = inconsistency.row_index,
                        errors = ?inconsistency.errors,
                        "Discarded CSV row"
                    );
                    report.record_discarded(inconsistency);
                }
            }
        }

        debug_assert!(report.is_consistent_with(clean_records.len()));

        let preview = clean_records
            .iter()
            .take(self.config.preview_size)
            .cloned()
            .collect();

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Processed Koha export: {}",
            report.summary()
        );

        Ok(IngestionResult {
            clean_records,
            report,
            preview,
        })
    }
}

impl Default for LoanIngestion {
    fn default() -> Self {
        Self::new(IngestionConfig::default())
    }
}
