// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types and value objects for CSV import
// No I/O, no async

mod csv_row;
mod import_settings;
mod projection;

pub use csv_row::{CsvField, FieldRecord, HeaderRow, RawRow};
pub use import_settings::ImportSettings;
pub use projection::{is_sql_identifier, DerivationRule, Projection};
