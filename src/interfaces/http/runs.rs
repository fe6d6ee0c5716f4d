use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

use crate::application::ImportReport;
use crate::domain::batch::{
    BatchState, Progress, RowOutcome, BATCH_ERROR_MESSAGE, BATCH_INIT_MESSAGE, BATCH_TITLE,
};
use crate::domain::error::{AppError, Result};

/// Snapshot of one run as returned by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub run_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub state: BatchState,
    pub current: usize,
    pub total: usize,
    pub percentage: f32,
    pub message: String,
    pub warning: Option<String>,
    pub skipped_rows: usize,
    pub failures: Vec<RowOutcome>,
    pub started_at: String,
    #[serde(skip)]
    fingerprint: String,
}

impl RunStatus {
    fn set_progress(&mut self, progress: Progress) {
        self.current = progress.current;
        self.total = progress.total;
        self.percentage = progress.percentage();
    }
}

const MAX_RUNS: usize = 100;

#[derive(Default)]
struct Runs {
    by_id: HashMap<Uuid, RunStatus>,
    /// Run ids, oldest first
    order: VecDeque<Uuid>,
}

impl Runs {
    fn get_mut(&mut self, run_id: &Uuid) -> Option<&mut RunStatus> {
        self.by_id.get_mut(run_id)
    }

    fn insert(&mut self, status: RunStatus) {
        self.order.push_back(status.run_id);
        self.by_id.insert(status.run_id, status);
        self.evict_finished();
    }

    /// Drop the oldest finished runs beyond the cap; unfinished runs always stay
    fn evict_finished(&mut self) {
        while self.by_id.len() > MAX_RUNS {
            let by_id = &self.by_id;
            let Some(pos) = self
                .order
                .iter()
                .position(|id| by_id.get(id).map_or(true, |run| run.state.is_finished()))
            else {
                break;
            };
            if let Some(id) = self.order.remove(pos) {
                self.by_id.remove(&id);
            }
        }
    }
}

/// Recent runs started by this process, keyed by run id
#[derive(Default)]
pub struct RunRegistry {
    runs: Mutex<Runs>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Runs> {
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new run unless one for the same content is still going
    pub fn begin(
        &self,
        run_id: Uuid,
        file_name: &str,
        fingerprint: &str,
        total: usize,
        skipped_rows: usize,
    ) -> Result<RunStatus> {
        let mut runs = self.lock();

        if let Some(active) = runs
            .by_id
            .values()
            .find(|run| run.fingerprint == fingerprint && !run.state.is_finished())
        {
            return Err(AppError::Conflict(format!(
                "This file is already being imported (run {}).",
                active.run_id
            )));
        }

        let status = RunStatus {
            run_id,
            title: BATCH_TITLE.to_string(),
            file_name: file_name.to_string(),
            state: BatchState::NotStarted,
            current: 0,
            total,
            percentage: 0.0,
            message: BATCH_INIT_MESSAGE.to_string(),
            warning: None,
            skipped_rows,
            failures: Vec::new(),
            started_at: Local::now().to_rfc3339(),
            fingerprint: fingerprint.to_string(),
        };
        runs.insert(status.clone());
        Ok(status)
    }

    pub fn update_progress(&self, run_id: Uuid, progress: Progress) {
        if let Some(run) = self.lock().get_mut(&run_id) {
            if !run.state.is_finished() {
                run.state = BatchState::Running;
                run.message = progress.message();
            }
            run.set_progress(progress);
        }
    }

    pub fn finish(
        &self,
        run_id: Uuid,
        state: BatchState,
        progress: Progress,
        report: &ImportReport,
        outcomes: &[RowOutcome],
    ) {
        let mut runs = self.lock();
        if let Some(run) = runs.get_mut(&run_id) {
            run.state = state;
            run.set_progress(progress);
            run.message = report.message.clone();
            run.warning = report.warning.clone();
            run.failures = outcomes
                .iter()
                .filter(|outcome| !outcome.is_imported())
                .cloned()
                .collect();
        }
        runs.evict_finished();
    }

    /// The task driving the run stopped without a report
    pub fn abort(&self, run_id: Uuid) {
        let mut runs = self.lock();
        if let Some(run) = runs.get_mut(&run_id) {
            if !run.state.is_finished() {
                run.state = BatchState::Failed;
                run.message = BATCH_ERROR_MESSAGE.to_string();
            }
        }
        runs.evict_finished();
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, run_id: Uuid) -> Option<RunStatus> {
        self.lock().by_id.get(&run_id).cloned()
    }
}
