pub mod use_cases;

pub use use_cases::batch_executor::{BatchExecutor, StepOutcome};
pub use use_cases::csv_import::{CsvImportUseCase, PreparedBatch};
pub use use_cases::report_emitter::{ImportReport, Notifier, ReportEmitter};
