// ============================================================
// LOAN RECORD TYPES
// ============================================================
// Raw export rows and the clean records derived from them

use serde::{Deserialize, Serialize};

use super::LibraryCode;

/// Snapshot titles are cut to this many characters
const SNAPSHOT_TITLE_CHARS: usize = 60;

/// One data row of the Koha export, addressed by the six source columns.
/// A column missing from the header reads as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLoanRow {
    pub year: String,
    pub month: String,
    pub library: String,
    pub program: String,
    pub title: String,
    pub transaction_count: String,
}

impl RawLoanRow {
    pub const YEAR_COLUMN: &'static str = "Anio";
    pub const MONTH_COLUMN: &'static str = "Mes";
    pub const LIBRARY_COLUMN: &'static str = "Biblioteca_Origen";
    pub const PROGRAM_COLUMN: &'static str = "Carrera_Programa";
    pub const TITLE_COLUMN: &'static str = "Titulo_Libro";
    pub const TRANSACTIONS_COLUMN: &'static str = "Total_Transacciones";

    /// Build a row from a column lookup (header name -> cell)
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let cell = |column: &str| lookup(column).unwrap_or_default().to_string();

        Self {
            year: cell(Self::YEAR_COLUMN),
            month: cell(Self::MONTH_COLUMN),
            library: cell(Self::LIBRARY_COLUMN),
            program: cell(Self::PROGRAM_COLUMN),
            title: cell(Self::TITLE_COLUMN),
            transaction_count: cell(Self::TRANSACTIONS_COLUMN),
        }
    }

    /// Original values kept for operator review when the row is discarded
    pub fn snapshot(&self) -> OriginalValues {
        OriginalValues {
            year: self.year.clone(),
            month: self.month.clone(),
            library: self.library.clone(),
            program: self.program.clone(),
            title: self.title.chars().take(SNAPSHOT_TITLE_CHARS).collect(),
            transaction_count: self.transaction_count.clone(),
        }
    }
}

/// Untouched source values of a discarded row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalValues {
    #[serde(rename = "Anio")]
    pub year: String,
    #[serde(rename = "Mes")]
    pub month: String,
    #[serde(rename = "Biblioteca")]
    pub library: String,
    #[serde(rename = "Carrera")]
    pub program: String,
    #[serde(rename = "Titulo")]
    pub title: String,
    #[serde(rename = "Total")]
    pub transaction_count: String,
}

/// A loan row in which every field passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanLoanRecord {
    pub year: i32,
    pub month: i32,
    pub library: LibraryCode,
    pub program: String,
    pub title: String,
    pub transaction_count: i32,
}

/// A clean record sent back by a client. The library stays free text
/// until it is checked again, so one bad record cannot reject the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedLoanRecord {
    pub year: i32,
    pub month: i32,
    pub library: String,
    pub program: String,
    pub title: String,
    pub transaction_count: i32,
}
