pub mod use_cases;

pub use use_cases::loan_confirmation::LoanConfirmation;
pub use use_cases::loan_ingestion::LoanIngestion;
