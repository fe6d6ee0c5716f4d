// ============================================================
// CSV PARSER
// ============================================================
// Stream CSV records as raw rows behind a captured header

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::domain::csv::{HeaderRow, RawRow};
use crate::domain::error::{AppError, Result};

/// CSV parser producing a lazy row stream
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
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

    /// Open a file on disk and capture its header
    pub fn open(&self, path: &Path) -> Result<CsvRows<File>> {
        let file = File::open(path).map_err(|e| {
            AppError::IoError(format!("Failed to open file {}: {}", path.display(), e))
        })?;
        self.read(file)
    }

    /// Capture the header from any reader; data rows are read on demand
    pub fn read<R: Read>(&self, reader: R) -> Result<CsvRows<R>> {
        let reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Allow rows with different lengths
            .from_reader(reader);

        let mut rows = CsvRows {
            reader,
            header: None,
            record: ByteRecord::new(),
            finished: false,
        };
        rows.header = rows.read_header()?;
        Ok(rows)
    }
}

/// Data rows of one CSV stream, following its header
pub struct CsvRows<R> {
    reader: csv::Reader<R>,
    header: Option<HeaderRow>,
    record: ByteRecord,
    finished: bool,
}

impl<R: Read> CsvRows<R> {
    /// Header captured from the first non-empty record, if the stream had one
    pub fn header(&self) -> Option<&HeaderRow> {
        self.header.as_ref()
    }

    fn read_header(&mut self) -> Result<Option<HeaderRow>> {
        while let Some(item) = self.next_raw() {
            match item {
                Ok(raw) if raw.is_blank() => continue,
                Ok(raw) => return Ok(Some(HeaderRow::new(raw.cells))),
                Err(AppError::MalformedRow(msg)) => {
                    return Err(AppError::ValidationError(format!(
                        "CSV header could not be read: {}",
                        msg
                    )))
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    fn next_raw(&mut self) -> Option<Result<RawRow>> {
        if self.finished {
            return None;
        }

        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => {
                self.finished = true;
                None
            }
            Ok(true) => {
                let line = self.record.position().map(|p| p.line()).unwrap_or(0);
                Some(Ok(decode_record(line, &self.record)))
            }
            Err(e) if e.is_io_error() => {
                self.finished = true;
                Some(Err(AppError::IoError(format!("Failed to read CSV: {}", e))))
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                Some(Err(AppError::MalformedRow(format!("line {}: {}", line, e))))
            }
        }
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_raw()
    }
}

/// UTF-8 when the cell is valid, otherwise Windows-1252
fn decode_field(field: &[u8]) -> String {
    match UTF_8.decode_without_bom_handling_and_without_replacement(field) {
        Some(value) => value.into_owned(),
        None => {
            let (value, _) = WINDOWS_1252.decode_without_bom_handling(field);
            value.into_owned()
        }
    }
}

fn decode_record(line: u64, record: &ByteRecord) -> RawRow {
    RawRow::new(line, record.iter().map(decode_field).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collect(rows: CsvRows<&[u8]>) -> Vec<Result<RawRow>> {
        rows.collect()
    }

    #[test]
    fn test_parse_simple_csv() {
        let content = "first_name,last_name\nAnn,Lee\nBo,Shah";
        let rows = CsvParser::new().read(content.as_bytes()).unwrap();

        assert_eq!(
            rows.header().unwrap().names(),
            ["first_name", "last_name"]
        );

        let rows: Vec<RawRow> = collect(rows).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["Ann", "Lee"]);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].cells, vec!["Bo", "Shah"]);
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let rows = CsvParser::new().read("first_name,last_name\n".as_bytes()).unwrap();
        assert!(rows.header().is_some());
        assert_eq!(collect(rows).len(), 0);
    }

    #[test]
    fn test_empty_stream_has_no_header() {
        let rows = CsvParser::new().read("".as_bytes()).unwrap();
        assert!(rows.header().is_none());
        assert_eq!(collect(rows).len(), 0);
    }

    #[test]
    fn test_header_taken_from_first_non_empty_line() {
        let content = "\n,\nfirst_name,last_name\nAnn,Lee\n";
        let rows = CsvParser::new().read(content.as_bytes()).unwrap();
        assert_eq!(rows.header().unwrap().names()[0], "first_name");
        assert_eq!(collect(rows).len(), 1);
    }

    #[test]
    fn test_quoted_fields_and_short_rows() {
        let content = "first_name,last_name\n\"Lee, Ann\",\"O\"\"Neil\"\nBo\n";
        let rows: Vec<RawRow> = collect(CsvParser::new().read(content.as_bytes()).unwrap())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows[0].cells, vec!["Lee, Ann", "O\"Neil"]);
        assert_eq!(rows[1].cell(0), Some("Bo"));
        assert_eq!(rows[1].cell(1), None);
    }

    #[test]
    fn test_windows_1252_cells_are_decoded() {
        let mut content = b"first_name,last_name\n".to_vec();
        content.extend_from_slice(b"Jos\xe9,Garc\xeda\n");
        content.extend_from_slice(b"Ren\xc3\xa9,Lee\n");

        let rows: Vec<RawRow> = collect(CsvParser::new().read(content.as_slice()).unwrap())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, vec!["José", "García"]);
        assert_eq!(rows[1].cells, vec!["René", "Lee"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let content = "first_name;last_name\nAnn;Lee\n";
        let rows = CsvParser::new().with_delimiter(b';').read(content.as_bytes()).unwrap();
        let rows: Vec<RawRow> = collect(rows).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].cells, vec!["Ann", "Lee"]);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = CsvParser::new().open(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(AppError::IoError(_))));
    }

    #[test]
    fn test_open_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}first_name,last_name\r\nAnn,Lee\r\n").unwrap();

        let rows = CsvParser::new().open(file.path()).unwrap();
        assert_eq!(rows.header().unwrap().names()[0], "first_name");
        let rows: Vec<RawRow> = rows.map(|r| r.unwrap()).collect();
        assert_eq!(rows[0].cells, vec!["Ann", "Lee"]);
    }
}
