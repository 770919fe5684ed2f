pub mod error;
pub mod statistics;
pub mod usage;

// Koha circulation ingestion
pub mod loan;
