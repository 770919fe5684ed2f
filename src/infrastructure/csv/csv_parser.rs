// ============================================================
// CSV PARSER
// ============================================================
// Decode uploaded bytes and read Koha export rows by column name

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::error::AppError;
use crate::domain::loan::RawLoanRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding a payload was finally read with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Utf8,
    Latin1,
}

impl std::fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadEncoding::Utf8 => write!(f, "UTF-8"),
            PayloadEncoding::Latin1 => write!(f, "Latin-1"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedPayload {
    pub text: String,
    pub encoding: PayloadEncoding,
}

/// Decode as UTF-8 (a leading BOM is dropped), falling back to Latin-1.
/// Latin-1 maps every byte to a code point, so this never fails.
pub fn decode_payload(bytes: &[u8]) -> DecodedPayload {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match encoding_rs::UTF_8.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => DecodedPayload {
            text: text.into_owned(),
            encoding: PayloadEncoding::Utf8,
        },
        None => DecodedPayload {
            text: bytes.iter().copied().map(char::from).collect(),
            encoding: PayloadEncoding::Latin1,
        },
    }
}

/// CSV parser for header-addressed exports
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Maximum allowed record length
    max_record_length: usize,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            max_record_length: 1024 * 1024, // 1MB
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse decoded CSV text into loan rows; the first line is the header
    pub fn parse_loan_rows(&self, content: &str) -> Result<Vec<RawLoanRow>, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::Headers)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let columns = column_positions(&headers);

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 2, e))
            })?;

            if record.as_slice().len() > self.max_record_length {
                return Err(AppError::ParseError(format!(
                    "CSV row {} exceeds {} bytes",
                    index + 2,
                    self.max_record_length
                )));
            }

            rows.push(RawLoanRow::from_lookup(|column| {
                columns.get(column).and_then(|&idx| record.get(idx))
            }));
        }

        Ok(rows)
    }
}

/// Header name -> column index; the first occurrence of a duplicate wins
fn column_positions(headers: &StringRecord) -> HashMap<String, usize> {
    let mut positions = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        positions.entry(header.to_string()).or_insert(idx);
    }
    positions
}
