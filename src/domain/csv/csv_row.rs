// ============================================================
// CSV ROW TYPES
// ============================================================
// Data structures representing parsed and sanitized CSV content

use serde::{Deserialize, Serialize};

/// Column names captured from the first non-empty record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRow {
    names: Vec<String>,
}

impl HeaderRow {
    /// Build a header from raw cells, stripping a byte-order mark and whitespace
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = cells
            .into_iter()
            .enumerate()
            .map(|(idx, cell)| {
                let cell = cell.as_ref();
                let cell = if idx == 0 {
                    cell.trim_start_matches('\u{feff}')
                } else {
                    cell
                };
                cell.trim().to_string()
            })
            .collect();

        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One data record exactly as read, aligned by position with the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source file where the record starts
    pub line: u64,

    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    /// Cell at a header position; short rows yield `None`
    pub fn cell(&self, position: usize) -> Option<&str> {
        self.cells.get(position).map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// A single sanitized field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvField {
    /// Header name the value was found under
    pub name: String,

    /// Sanitized value, never empty
    pub value: String,
}

impl CsvField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Sanitized, recognized fields of one imported row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Source line, kept for progress and failure reporting
    pub line: u64,

    fields: Vec<CsvField>,
}

impl FieldRecord {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            fields: Vec::new(),
        }
    }

    /// Add a field unless one with the same name is already present
    pub fn insert(&mut self, field: CsvField) -> bool {
        if self.get(&field.name).is_some() {
            return false;
        }
        self.fields.push(field);
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> &[CsvField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_strips_bom_and_whitespace() {
        let header = HeaderRow::new(["\u{feff}first_name", " last_name "]);
        assert_eq!(header.names(), ["first_name", "last_name"]);
    }

    #[test]
    fn test_short_row_has_no_trailing_cell() {
        let row = RawRow::new(2, vec!["Ann".to_string()]);
        assert_eq!(row.cell(0), Some("Ann"));
        assert_eq!(row.cell(1), None);
    }

    #[test]
    fn test_field_record_keeps_first_value() {
        let mut record = FieldRecord::new(2);
        assert!(record.insert(CsvField::new("first_name", "Ann")));
        assert!(!record.insert(CsvField::new("first_name", "Bo")));
        assert_eq!(record.get("first_name"), Some("Ann"));
        assert_eq!(record.len(), 1);
    }
}
