// ============================================================
// INGESTION CONFIGURATION
// ============================================================
// Bounds applied while validating a Koha export

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

/// Configuration for loan batch ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Earliest accepted year (default: 2020)
    pub min_year: i32,

    /// Latest accepted year (default: current calendar year)
    pub max_year: i32,

    /// Number of accepted records echoed back as preview (default: 20)
    pub preview_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            min_year: 2020,
            max_year: Local::now().year(),
            preview_size: 20,
        }
    }
}

impl IngestionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_year(mut self, min_year: i32) -> Self {
        self.min_year = min_year;
        self
    }

    pub fn with_max_year(mut self, max_year: i32) -> Self {
        self.max_year = max_year;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_year > self.max_year {
            return Err(format!(
                "min_year ({}) must not exceed max_year ({})",
                self.min_year, self.max_year
            ));
        }
        Ok(())
    }

    pub fn year_in_range(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}
