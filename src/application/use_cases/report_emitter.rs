// ============================================================
// REPORT EMITTER
// ============================================================
// Final user-facing summary of a batch run

use serde::Serialize;
use std::sync::Arc;

use crate::domain::batch::ImportResult;

pub const FAILURE_MESSAGE: &str = "Finished with errors.";

/// Where user-facing messages end up
pub trait Notifier {
    fn status(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Summary produced once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub success: bool,
    pub imported: usize,
    pub failed: usize,
    pub message: String,
    pub warning: Option<String>,
}

fn rows(count: usize) -> String {
    if count == 1 {
        "1 row".to_string()
    } else {
        format!("{} rows", count)
    }
}

pub struct ReportEmitter {
    notifier: Arc<dyn Notifier + Send + Sync>,
}

impl ReportEmitter {
    pub fn new(notifier: Arc<dyn Notifier + Send + Sync>) -> Self {
        Self { notifier }
    }

    /// Build the report for `result` and deliver it to the notifier
    pub fn emit(&self, result: &ImportResult) -> ImportReport {
        let imported = result.imported();
        let failed = result.failed();

        if !result.success {
            self.notifier.error(FAILURE_MESSAGE);
            return ImportReport {
                success: false,
                imported,
                failed,
                message: FAILURE_MESSAGE.to_string(),
                warning: None,
            };
        }

        let message = format!("{} imported successfully.", rows(imported));
        self.notifier.status(&message);

        let warning = (failed > 0).then(|| format!("{} could not be imported.", rows(failed)));
        if let Some(warning) = &warning {
            self.notifier.warning(warning);
        }

        ImportReport {
            success: true,
            imported,
            failed,
            message,
            warning,
        }
    }
}
