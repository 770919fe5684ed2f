pub mod loan_confirmation;
pub mod loan_ingestion;
pub mod row_validator;
pub mod statistics;
pub mod text_normalizer;
pub mod usage_mapper;
