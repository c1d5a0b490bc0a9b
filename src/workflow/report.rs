use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::{StepKind, StepResult, StepStatus, TestRun};
use crate::error::HarnessError;

/// Owned and mutated by the interpreter while a run is in flight; frozen at
/// finalize, after which it only hands out the same [`TestRun`].
#[derive(Debug)]
pub struct RunReporter {
    run_id: Uuid,
    workflow_name: String,
    terminal_actions: Vec<String>,
    started_at: chrono::DateTime<Utc>,
    results: Vec<StepResult>,
    error: Option<HarnessError>,
    finalized: Option<TestRun>,
}

impl RunReporter {
    pub fn new(workflow_name: impl Into<String>, terminal_actions: Vec<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            workflow_name: workflow_name.into(),
            terminal_actions,
            started_at: Utc::now(),
            results: Vec::new(),
            error: None,
            finalized: None,
        }
    }

    /// Appends one step result. Fails once the run has been finalized.
    pub fn record(&mut self, result: StepResult) -> Result<(), HarnessError> {
        if self.finalized.is_some() {
            return Err(HarnessError::invalid_state(
                "cannot record a step result after finalize",
            ));
        }
        debug!(step = %result.name, status = ?result.status, "recorded step result");
        self.results.push(result);
        Ok(())
    }

    /// Marks the run as aborted by a run-level error. The error dominates
    /// the aggregate status at finalize.
    pub fn abort(&mut self, error: HarnessError) {
        if self.finalized.is_none() {
            self.error = Some(error);
        }
    }

    /// Freezes the run and computes the aggregate status. Idempotent: every
    /// call returns the identical [`TestRun`].
    pub fn finalize(&mut self) -> TestRun {
        if let Some(run) = &self.finalized {
            return run.clone();
        }
        let status = self.aggregate_status();
        let run = TestRun {
            run_id: self.run_id,
            workflow_name: self.workflow_name.clone(),
            status,
            error: self.error.clone(),
            step_results: self.results.clone(),
            started_at: self.started_at,
            completed_at: Utc::now(),
        };
        self.finalized = Some(run.clone());
        run
    }

    /// Aggregation rule:
    /// 1. a run-level error forces Aborted (TimedOut for callback timeout);
    /// 2. a trigger that did not succeed propagates its own status;
    /// 3. otherwise the most severe recorded status wins, first encountered
    ///    in traversal order among equals;
    /// 4. a run whose only blemish is skipped steps still succeeds when at
    ///    least one terminal action succeeded.
    fn aggregate_status(&self) -> StepStatus {
        if let Some(error) = &self.error {
            return match error {
                HarnessError::CallbackTimeout { .. } => StepStatus::TimedOut,
                _ => StepStatus::Aborted,
            };
        }

        let trigger_status = self
            .results
            .iter()
            .find(|r| r.kind == StepKind::Trigger)
            .map(|r| r.status)
            .unwrap_or(StepStatus::Aborted);
        if trigger_status != StepStatus::Succeeded {
            return trigger_status;
        }

        let mut worst = StepStatus::Succeeded;
        for result in &self.results {
            if result.status.severity() > worst.severity() {
                worst = result.status;
            }
        }

        if worst == StepStatus::Succeeded {
            return StepStatus::Succeeded;
        }
        if worst == StepStatus::Skipped {
            let terminal_succeeded = self.terminal_actions.iter().any(|name| {
                self.results
                    .iter()
                    .any(|r| &r.name == name && r.status == StepStatus::Succeeded)
            });
            if self.terminal_actions.is_empty() || terminal_succeeded {
                return StepStatus::Succeeded;
            }
        }
        worst
    }
}
