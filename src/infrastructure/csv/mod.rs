// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Payload decoding and header-addressed CSV parsing

mod csv_parser;

pub use csv_parser::{decode_payload, CsvParser, DecodedPayload, PayloadEncoding};
