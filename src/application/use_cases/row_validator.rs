// ============================================================
// ROW VALIDATOR
// ============================================================
// Field-by-field validation of one Koha export row

use std::num::IntErrorKind;

use crate::application::use_cases::text_normalizer::{normalize_program, normalize_text};
use crate::domain::loan::{
    CleanLoanRecord, Inconsistency, IngestionConfig, LibraryCode, RawLoanRow, SubmittedLoanRecord,
};

/// Result of validating a single row: all-or-nothing
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(CleanLoanRecord),
    Rejected(Inconsistency),
}

/// Per-field results of one row, before the accept/reject decision.
/// Every field is checked even after an earlier one failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub year: Option<i32>,
    pub month: Option<i32>,
    /// Upper-cased, trimmed source code; kept even when unknown
    pub library_code: String,
    pub library: Option<LibraryCode>,
    pub program: Option<String>,
    pub title: Option<String>,
    pub transaction_count: Option<i32>,
    pub errors: Vec<String>,
}

impl ValidatedRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_record(self) -> Option<CleanLoanRecord> {
        if !self.is_valid() {
            return None;
        }

        Some(CleanLoanRecord {
            year: self.year?,
            month: self.month?,
            library: self.library?,
            program: self.program?,
            title: self.title?,
            transaction_count: self.transaction_count?,
        })
    }
}

pub struct RowValidator {
    config: IngestionConfig,
}

impl RowValidator {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    /// Validate a row and decide whether it enters the clean set.
    /// `row_index` is the 1-based line number (header is line 1).
    pub fn validate(&self, row: &RawLoanRow, row_index: usize) -> RowOutcome {
        let checked = self.check_fields(row);

        if checked.is_valid() {
            if let Some(record) = checked.clone().into_record() {
                return RowOutcome::Accepted(record);
            }
        }

        RowOutcome::Rejected(Inconsistency {
            row_index,
            errors: checked.errors,
            original_values: row.snapshot(),
        })
    }

    /// Run every field check and collect all errors
    pub fn check_fields(&self, row: &RawLoanRow) -> ValidatedRow {
        let mut errors = Vec::new();

        let year = self.check_year(&row.year, &mut errors);
        let month = check_month(&row.month, &mut errors);

        let library_code = row.library.trim().to_uppercase();
        let library = LibraryCode::from_code(&library_code);
        if library.is_none() {
            errors.push(format!("Biblioteca desconocida: '{}'", library_code));
        }

        let program = normalize_text(&row.program).map(|p| normalize_program(&p));
        if program.is_none() {
            errors.push("Carrera vacía".to_string());
        }

        let title = normalize_text(&row.title);
        if title.is_none() {
            errors.push("Título vacío".to_string());
        }

        let transaction_count = check_transaction_count(&row.transaction_count, &mut errors);

        ValidatedRow {
            year,
            month,
            library_code,
            library,
            program,
            title,
            transaction_count,
            errors,
        }
    }

    /// Re-check a record that came back from a client before it is persisted
    pub fn check_submitted(
        &self,
        record: &SubmittedLoanRecord,
    ) -> Result<CleanLoanRecord, Vec<String>> {
        let mut violations = Vec::new();

        if !self.config.year_in_range(record.year) {
            violations.push(format!("Año fuera de rango: {}", record.year));
        }
        if !(1..=12).contains(&record.month) {
            violations.push(format!("Mes fuera de rango: {}", record.month));
        }

        let library_code = record.library.trim().to_uppercase();
        let library = LibraryCode::from_code(&library_code);
        if library.is_none() {
            violations.push(format!("Biblioteca desconocida: '{}'", library_code));
        }

        if record.program.trim().is_empty() {
            violations.push("Carrera vacía".to_string());
        }
        if record.title.trim().is_empty() {
            violations.push("Título vacío".to_string());
        }
        if record.transaction_count < 0 {
            violations.push(format!("Total negativo: {}", record.transaction_count));
        }

        match library {
            Some(library) if violations.is_empty() => Ok(CleanLoanRecord {
                year: record.year,
                month: record.month,
                library,
                program: record.program.clone(),
                title: record.title.clone(),
                transaction_count: record.transaction_count,
            }),
            _ => Err(violations),
        }
    }

    fn check_year(&self, raw: &str, errors: &mut Vec<String>) -> Option<i32> {
        match parse_integer(raw) {
            Ok(year) => match i32::try_from(year) {
                Ok(year) if self.config.year_in_range(year) => Some(year),
                _ => {
                    errors.push(format!("Año fuera de rango: {}", year));
                    None
                }
            },
            Err(IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                errors.push(format!("Año fuera de rango: {}", raw.trim()));
                None
            }
            Err(_) => {
                errors.push(format!("Año inválido: '{}'", raw));
                None
            }
        }
    }
}

/// Integers wider than i64 report an overflow kind instead of a plain parse failure
fn parse_integer(raw: &str) -> Result<i64, IntErrorKind> {
    raw.trim().parse::<i64>().map_err(|e| e.kind().clone())
}

fn check_month(raw: &str, errors: &mut Vec<String>) -> Option<i32> {
    match parse_integer(raw) {
        Ok(month) if (1..=12).contains(&month) => Some(month as i32),
        Ok(month) => {
            errors.push(format!("Mes fuera de rango: {}", month));
            None
        }
        Err(IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            errors.push(format!("Mes fuera de rango: {}", raw.trim()));
            None
        }
        Err(_) => {
            errors.push(format!("Mes inválido: '{}'", raw));
            None
        }
    }
}

fn check_transaction_count(raw: &str, errors: &mut Vec<String>) -> Option<i32> {
    match parse_integer(raw) {
        Ok(total) if total < 0 => {
            errors.push(format!("Total negativo: {}", total));
            None
        }
        Ok(total) => match i32::try_from(total) {
            Ok(total) => Some(total),
            Err(_) => {
                errors.push(format!("Total fuera de rango: {}", total));
                None
            }
        },
        Err(IntErrorKind::NegOverflow) => {
            errors.push(format!("Total negativo: {}", raw.trim()));
            None
        }
        Err(IntErrorKind::PosOverflow) => {
            errors.push(format!("Total fuera de rango: {}", raw.trim()));
            None
        }
        Err(_) => {
            errors.push(format!("Total inválido: '{}'", raw));
            None
        }
    }
}
