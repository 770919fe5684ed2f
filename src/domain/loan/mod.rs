// ============================================================
// LOAN DOMAIN LAYER
// ============================================================
// Core types for library circulation (Koha export) ingestion
// No I/O, no async, no external dependencies

mod ingestion_config;
mod library;
mod loan_record;
mod quality_report;

pub use ingestion_config::IngestionConfig;
pub use library::LibraryCode;
pub use loan_record::{CleanLoanRecord, OriginalValues, RawLoanRow, SubmittedLoanRecord};
pub use quality_report::{Inconsistency, QualityReport};
