// ============================================================
// LOAN UPLOAD / CONFIRM USE CASE
// ============================================================
// Stateless two-step flow: the client keeps the clean set returned
// by the upload and sends it back to confirm persistence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::application::use_cases::loan_ingestion::{IngestionResult, LoanIngestion};
use crate::application::use_cases::row_validator::RowValidator;
use crate::domain::error::{AppError, Result};
use crate::domain::loan::{CleanLoanRecord, IngestionConfig, QualityReport, SubmittedLoanRecord};
use crate::infrastructure::db::loans::LoanStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file: String,
    pub report: QualityReport,
    pub preview: Vec<CleanLoanRecord>,
    /// Full clean set, retained by the client until it confirms
    pub clean_records: Vec<CleanLoanRecord>,
}

/// Records are read one by one in `confirm`, so a malformed entry only fails itself
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmRequest {
    #[validate(length(min = 1))]
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub status: String,
    pub inserted: usize,
    pub failed: usize,
    pub message: String,
}

/// Only `.csv` uploads are accepted, in any letter case
pub fn ensure_csv_filename(filename: &str) -> Result<()> {
    if filename.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Solo se aceptan archivos CSV".to_string(),
        ))
    }
}

/// Run the batch processor over an uploaded file. Nothing is persisted.
pub fn upload(ingestion: &LoanIngestion, filename: &str, payload: &[u8]) -> Result<UploadResponse> {
    ensure_csv_filename(filename)?;

    let IngestionResult {
        clean_records,
        report,
        preview,
    } = ingestion.process(payload)?;

    Ok(UploadResponse {
        file: filename.to_string(),
        report,
        preview,
        clean_records,
    })
}

pub struct LoanConfirmation {
    store: Arc<dyn LoanStore>,
    validator: RowValidator,
}

impl LoanConfirmation {
    pub fn new(store: Arc<dyn LoanStore>, config: IngestionConfig) -> Self {
        Self {
            store,
            validator: RowValidator::new(config),
        }
    }

    /// Persist resubmitted records. Records that cannot be read or no longer
    /// satisfy the clean-record rules are counted as failed and never reach the store.
    pub async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmResponse> {
        request
            .validate()
            .map_err(|_| AppError::ValidationError("No hay registros para insertar".to_string()))?;

        let mut clean = Vec::with_capacity(request.records.len());
        let mut rejected = 0;

        for (idx, value) in request.records.iter().enumerate() {
            let submitted = match SubmittedLoanRecord::deserialize(value) {
                Ok(submitted) => submitted,
                Err(e) => {
                    warn!(record = idx, error = %e, "Unreadable resubmitted record");
                    rejected += 1;
                    continue;
                }
            };

            match self.validator.check_submitted(&submitted) {
                Ok(record) => clean.push(record),
                Err(violations) => {
                    warn!(record = idx, ?violations, "Rejected resubmitted record");
                    rejected += 1;
                }
            }
        }

        let summary = self.store.insert_all(&clean).await?;

        let failed = summary.failed + rejected;
        info!(inserted = summary.inserted, failed, "Confirmed Koha batch");

        Ok(ConfirmResponse {
            status: "ok".to_string(),
            inserted: summary.inserted,
            failed,
            message: format!("{} registros insertados correctamente.", summary.inserted),
        })
    }
}
