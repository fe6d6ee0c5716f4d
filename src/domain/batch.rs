// ============================================================
// BATCH DOMAIN TYPES
// ============================================================
// Operations, outcomes and progress of one batch run

use serde::{Deserialize, Serialize};

pub const BATCH_TITLE: &str = "Importing CSV data";
pub const BATCH_INIT_MESSAGE: &str = "Commencing";
pub const BATCH_ERROR_MESSAGE: &str = "An error occurred during processing";

/// A row in its final storage shape: target column -> value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    columns: Vec<(String, String)>,
}

impl StorageRecord {
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Execution routine an operation is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportRoutine {
    InsertRow,
}

/// One unit of deferred row-import work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOperation {
    /// 0-based position in planned order
    pub sequence: usize,

    /// Source CSV line of the row
    pub line: u64,

    pub routine: ImportRoutine,

    pub record: StorageRecord,
}

/// Result of executing one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Imported {
        sequence: usize,
        line: u64,
    },
    Failed {
        sequence: usize,
        line: u64,
        reason: String,
    },
}

impl RowOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, RowOutcome::Imported { .. })
    }

    pub fn sequence(&self) -> usize {
        match self {
            RowOutcome::Imported { sequence, .. } | RowOutcome::Failed { sequence, .. } => {
                *sequence
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl BatchState {
    pub fn is_finished(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchState::NotStarted => write!(f, "not_started"),
            BatchState::Running => write!(f, "running"),
            BatchState::Completed => write!(f, "completed"),
            BatchState::Failed => write!(f, "failed"),
        }
    }
}

/// `(current, total)` after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Completion percentage; an empty batch counts as done
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f32 / self.total as f32 * 100.0
    }

    pub fn message(&self) -> String {
        format!("Processed {} out of {}.", self.current, self.total)
    }
}

/// Aggregate handed to the report emitter once a run ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub outcomes: Vec<RowOutcome>,
}

impl ImportResult {
    pub fn imported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_imported()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.imported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message_and_percentage() {
        let progress = Progress::new(1, 4);
        assert_eq!(progress.message(), "Processed 1 out of 4.");
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(Progress::new(0, 0).percentage(), 100.0);
    }

    #[test]
    fn test_import_result_counts() {
        let result = ImportResult {
            success: true,
            outcomes: vec![
                RowOutcome::Imported { sequence: 0, line: 2 },
                RowOutcome::Failed {
                    sequence: 1,
                    line: 3,
                    reason: "constraint".to_string(),
                },
            ],
        };
        assert_eq!(result.imported(), 1);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(RowOutcome::Imported { sequence: 0, line: 2 }).unwrap();
        assert_eq!(json["status"], "imported");
    }
}
