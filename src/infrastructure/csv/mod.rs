// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV streaming and cell sanitization

mod csv_parser;
mod sanitizer;

pub use csv_parser::{CsvParser, CsvRows};
pub use sanitizer::{escape_html, filter_xss, sanitize_value, RowSanitizer};
