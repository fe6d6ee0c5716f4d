// ============================================================
// BATCH EXECUTOR
// ============================================================
// Runs planned operations one step at a time against an ImportSink

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::report_emitter::{ImportReport, ReportEmitter};
use crate::domain::batch::{
    BatchState, ImportOperation, ImportResult, ImportRoutine, Progress, RowOutcome,
};
use crate::infrastructure::db::{ImportSink, SinkError};

/// What a single call to [`BatchExecutor::step`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// One more operation ran; more remain
    Progressed(Progress),

    /// The run is over and the report has been delivered
    Finished {
        progress: Progress,
        report: ImportReport,
    },
}

impl StepOutcome {
    pub fn progress(&self) -> Progress {
        match self {
            StepOutcome::Progressed(progress) | StepOutcome::Finished { progress, .. } => *progress,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, StepOutcome::Finished { .. })
    }
}

pub struct BatchExecutor {
    id: Uuid,
    sink: Arc<dyn ImportSink + Send + Sync>,
    emitter: ReportEmitter,
    queue: VecDeque<ImportOperation>,
    results: Vec<RowOutcome>,
    state: BatchState,
    total: usize,
    current: usize,
    report: Option<ImportReport>,
}

impl BatchExecutor {
    pub fn new(
        operations: Vec<ImportOperation>,
        sink: Arc<dyn ImportSink + Send + Sync>,
        emitter: ReportEmitter,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink,
            emitter,
            total: operations.len(),
            queue: operations.into(),
            results: Vec::new(),
            state: BatchState::NotStarted,
            current: 0,
            report: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.current, self.total)
    }

    pub fn results(&self) -> &[RowOutcome] {
        &self.results
    }

    pub fn report(&self) -> Option<&ImportReport> {
        self.report.as_ref()
    }

    /// Execute the next operation; the step that runs the last one also ends the run
    pub async fn step(&mut self) -> StepOutcome {
        if self.state.is_finished() {
            return self.finished_outcome();
        }

        if self.state == BatchState::NotStarted {
            self.state = BatchState::Running;
            info!(run_id = %self.id, total = self.total, "Batch started");
        }

        if let Some(operation) = self.queue.pop_front() {
            let result = match operation.routine {
                ImportRoutine::InsertRow => self.sink.insert(&operation.record).await,
            };
            self.current += 1;

            match result {
                Ok(()) => {
                    debug!(run_id = %self.id, line = operation.line, "Row imported");
                    self.results.push(RowOutcome::Imported {
                        sequence: operation.sequence,
                        line: operation.line,
                    });
                }
                Err(SinkError::Row(reason)) => {
                    warn!(run_id = %self.id, line = operation.line, reason = %reason, "Row rejected");
                    self.results.push(RowOutcome::Failed {
                        sequence: operation.sequence,
                        line: operation.line,
                        reason,
                    });
                }
                Err(SinkError::Unavailable(reason)) => {
                    error!(run_id = %self.id, line = operation.line, error = %reason, "Storage unavailable, aborting batch");
                    self.results.push(RowOutcome::Failed {
                        sequence: operation.sequence,
                        line: operation.line,
                        reason,
                    });
                    let dropped = self.queue.len();
                    self.queue.clear();
                    if dropped > 0 {
                        warn!(run_id = %self.id, dropped, "Remaining operations dropped");
                    }
                    return self.finish(false);
                }
            }
        }

        if self.queue.is_empty() {
            return self.finish(true);
        }

        StepOutcome::Progressed(self.progress())
    }

    /// Step until finished, yielding to the runtime between steps
    pub async fn run_to_completion<F>(&mut self, mut on_progress: Option<F>) -> ImportReport
    where
        F: FnMut(Progress),
    {
        loop {
            let outcome = self.step().await;
            let progress = outcome.progress();
            debug!(run_id = %self.id, "{}", progress.message());

            if let Some(callback) = on_progress.as_mut() {
                callback(progress);
            }

            if let StepOutcome::Finished { report, .. } = outcome {
                return report;
            }

            tokio::task::yield_now().await;
        }
    }

    fn finish(&mut self, success: bool) -> StepOutcome {
        self.state = if success {
            BatchState::Completed
        } else {
            BatchState::Failed
        };

        let result = ImportResult {
            success,
            outcomes: self.results.clone(),
        };
        let report = self.emitter.emit(&result);
        info!(
            run_id = %self.id,
            state = %self.state,
            imported = report.imported,
            failed = report.failed,
            "Batch finished"
        );
        self.report = Some(report);
        self.finished_outcome()
    }

    fn finished_outcome(&self) -> StepOutcome {
        StepOutcome::Finished {
            progress: self.progress(),
            report: self.report.clone().unwrap_or_else(|| ImportReport {
                success: self.state == BatchState::Completed,
                imported: 0,
                failed: 0,
                message: String::new(),
                warning: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::report_emitter::tests::RecordingNotifier;
    use crate::domain::batch::StorageRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stores names in memory; fails on configured calls
    #[derive(Default)]
    struct FakeSink {
        stored: Mutex<Vec<String>>,
        reject: Vec<String>,
        unavailable_after: Option<usize>,
    }

    #[async_trait]
    impl ImportSink for FakeSink {
        async fn insert(&self, record: &StorageRecord) -> Result<(), SinkError> {
            let name = record.get("full_name").unwrap_or("").to_string();
            let mut stored = self.stored.lock().unwrap();
            if self.unavailable_after == Some(stored.len()) {
                return Err(SinkError::Unavailable("pool closed".to_string()));
            }
            if self.reject.contains(&name) {
                return Err(SinkError::Row("constraint failed".to_string()));
            }
            stored.push(name);
            Ok(())
        }
    }

    fn operations(names: &[&str]) -> Vec<ImportOperation> {
        names
            .iter()
            .enumerate()
            .map(|(sequence, name)| {
                let mut record = StorageRecord::default();
                record.push("full_name", *name);
                ImportOperation {
                    sequence,
                    line: sequence as u64 + 2,
                    routine: ImportRoutine::InsertRow,
                    record,
                }
            })
            .collect()
    }

    fn executor(
        names: &[&str],
        sink: Arc<FakeSink>,
    ) -> (BatchExecutor, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let emitter = ReportEmitter::new(notifier.clone());
        (BatchExecutor::new(operations(names), sink, emitter), notifier)
    }

    #[tokio::test]
    async fn test_steps_in_order_and_completes() {
        let sink = Arc::new(FakeSink::default());
        let (mut executor, notifier) = executor(&["Ann Lee", "Bo Shah"], sink.clone());
        assert_eq!(executor.state(), BatchState::NotStarted);

        let first = executor.step().await;
        assert_eq!(first, StepOutcome::Progressed(Progress::new(1, 2)));
        assert_eq!(executor.state(), BatchState::Running);

        let second = executor.step().await;
        assert!(second.is_finished());
        assert_eq!(second.progress(), Progress::new(2, 2));
        assert_eq!(executor.state(), BatchState::Completed);

        assert_eq!(*sink.stored.lock().unwrap(), vec!["Ann Lee", "Bo Shah"]);
        assert_eq!(
            notifier.take(),
            vec![("status".to_string(), "2 rows imported successfully.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_row_failure_does_not_stop_run() {
        let sink = Arc::new(FakeSink {
            reject: vec!["Bo Shah".to_string()],
            ..Default::default()
        });
        let (mut executor, notifier) = executor(&["Ann Lee", "Bo Shah", "Cy Ng"], sink.clone());
        let report = executor.run_to_completion(None::<fn(Progress)>).await;

        assert_eq!(executor.state(), BatchState::Completed);
        assert_eq!(executor.results().len(), 3);
        assert!(!executor.results()[1].is_imported());
        assert_eq!(sink.stored.lock().unwrap().len(), 2);
        assert_eq!(report.message, "2 rows imported successfully.");
        assert_eq!(report.warning.as_deref(), Some("1 row could not be imported."));
        assert_eq!(notifier.take().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_run() {
        let sink = Arc::new(FakeSink {
            unavailable_after: Some(1),
            ..Default::default()
        });
        let (mut executor, notifier) = executor(&["Ann Lee", "Bo Shah", "Cy Ng"], sink.clone());

        assert!(!executor.step().await.is_finished());
        let outcome = executor.step().await;
        assert!(outcome.is_finished());
        assert_eq!(executor.state(), BatchState::Failed);
        assert_eq!(outcome.progress(), Progress::new(2, 3));
        assert_eq!(executor.results().len(), 2);
        assert_eq!(
            notifier.take(),
            vec![("error".to_string(), "Finished with errors.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_plan_completes_on_first_step() {
        let (mut executor, notifier) = executor(&[], Arc::new(FakeSink::default()));
        let outcome = executor.step().await;

        assert!(outcome.is_finished());
        assert_eq!(executor.state(), BatchState::Completed);
        assert!(executor.results().is_empty());
        assert_eq!(outcome.progress().percentage(), 100.0);
        assert_eq!(
            notifier.take(),
            vec![("status".to_string(), "0 rows imported successfully.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_report_emitted_once() {
        let (mut executor, notifier) = executor(&["Ann Lee"], Arc::new(FakeSink::default()));
        let first = executor.step().await;
        let again = executor.step().await;

        assert_eq!(first, again);
        assert_eq!(notifier.take().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_step() {
        let (mut executor, _) = executor(&["A", "B", "C"], Arc::new(FakeSink::default()));
        let mut seen = Vec::new();
        executor
            .run_to_completion(Some(|progress: Progress| seen.push(progress.current)))
            .await;
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
