// ============================================================
// CSV IMPORT USE CASE
// ============================================================
// Validate an upload, turn its rows into import operations and
// hand them to a batch executor

use std::io::{Cursor, Read};
use std::sync::Arc;

use tracing::{info, warn};

use super::batch_executor::BatchExecutor;
use super::operation_planner::OperationPlanner;
use super::report_emitter::{ImportReport, Notifier, ReportEmitter};
use super::upload_validator::UploadValidator;
use crate::domain::batch::ImportOperation;
use crate::domain::csv::{HeaderRow, ImportSettings};
use crate::domain::error::{AppError, Result};
use crate::domain::upload::UploadedFile;
use crate::infrastructure::csv::{CsvParser, RowSanitizer};
use crate::infrastructure::db::ImportSink;

/// Output of the parse/sanitize/plan phase, ready to execute
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub operations: Vec<ImportOperation>,
    /// Rows dropped because they could not be parsed
    pub skipped_rows: usize,
    /// Rows dropped because no recognized field had a value
    pub empty_rows: usize,
    pub header: Option<HeaderRow>,
}

impl PreparedBatch {
    pub fn total(&self) -> usize {
        self.operations.len()
    }
}

pub struct CsvImportUseCase {
    settings: ImportSettings,
    validator: UploadValidator,
    sanitizer: RowSanitizer,
    planner: OperationPlanner,
    sink: Arc<dyn ImportSink + Send + Sync>,
}

impl CsvImportUseCase {
    pub fn new(settings: ImportSettings, sink: Arc<dyn ImportSink + Send + Sync>) -> Result<Self> {
        settings.check()?;

        let validator = UploadValidator::from_settings(&settings);
        let sanitizer = RowSanitizer::new(settings.recognized_fields.iter().cloned());
        let planner = OperationPlanner::new(settings.projection.clone(), &settings.recognized_fields)?;

        Ok(Self {
            settings,
            validator,
            sanitizer,
            planner,
            sink,
        })
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Validate the upload and plan one operation per non-empty row
    pub fn prepare(&self, upload: &UploadedFile) -> Result<PreparedBatch> {
        self.validator.validate(upload)?;
        self.prepare_reader(Cursor::new(upload.content.as_slice()))
    }

    /// Parse, sanitize and plan rows from any reader
    pub fn prepare_reader<R: Read>(&self, reader: R) -> Result<PreparedBatch> {
        let parser = CsvParser::new().with_delimiter(self.settings.delimiter_byte());
        let mut rows = parser.read(reader)?;

        let Some(header) = rows.header().cloned() else {
            info!("Upload has no header row, nothing to import");
            return Ok(PreparedBatch {
                operations: Vec::new(),
                skipped_rows: 0,
                empty_rows: 0,
                header: None,
            });
        };

        let mut records = Vec::new();
        let mut skipped_rows = 0;
        let mut empty_rows = 0;

        for item in &mut rows {
            let raw = match item {
                Ok(raw) => raw,
                Err(AppError::MalformedRow(msg)) => {
                    warn!(reason = %msg, "Skipping malformed CSV row");
                    skipped_rows += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let record = self.sanitizer.sanitize(&header, &raw);
            if record.is_empty() {
                empty_rows += 1;
                continue;
            }
            records.push(record);
        }

        let operations = self.planner.plan(records);
        info!(
            operations = operations.len(),
            skipped_rows,
            empty_rows,
            "CSV upload planned"
        );

        Ok(PreparedBatch {
            operations,
            skipped_rows,
            empty_rows,
            header: Some(header),
        })
    }

    /// Executor over the prepared operations, reporting to `notifier`
    pub fn executor(
        &self,
        prepared: PreparedBatch,
        notifier: Arc<dyn Notifier + Send + Sync>,
    ) -> BatchExecutor {
        BatchExecutor::new(
            prepared.operations,
            self.sink.clone(),
            ReportEmitter::new(notifier),
        )
    }

    /// Whole pipeline in one call
    pub async fn import(
        &self,
        upload: &UploadedFile,
        notifier: Arc<dyn Notifier + Send + Sync>,
    ) -> Result<ImportReport> {
        let prepared = self.prepare(upload)?;
        let mut executor = self.executor(prepared, notifier);
        Ok(executor
            .run_to_completion(None::<fn(crate::domain::batch::Progress)>)
            .await)
    }
}
