use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HarnessError;

pub mod context;
mod graph;
pub mod interpreter;
pub mod mock;
pub mod parser;
pub mod report;

pub use context::ExecutionContext;
pub use interpreter::{CancelToken, RunOptions, WorkflowInterpreter, WorkflowRunner};
pub use mock::{
    MockErrorInfo, MockOutput, MockRegistry, MockSpec, StaticMock, TestMockDefinition,
};
pub use parser::WorkflowParser;
pub use report::RunReporter;

/// Runtime status of a single step, and of the run as a whole.
///
/// Mocks may only carry terminal statuses; `Pending` and `Running` exist for
/// the interpreter's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    TimedOut,
    Cancelled,
    Aborted,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }

    /// Severity for aggregate-status tie-breaking: Failed > TimedOut >
    /// Cancelled > Aborted > Skipped. Succeeded and non-terminal statuses
    /// carry no severity.
    pub(crate) fn severity(&self) -> u8 {
        match self {
            StepStatus::Failed => 5,
            StepStatus::TimedOut => 4,
            StepStatus::Cancelled => 3,
            StepStatus::Aborted => 2,
            StepStatus::Skipped => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Trigger,
    Action,
}

/// A dependency edge: the step named `step` must have finished with one of
/// `statuses` before the dependent action may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    pub step: String,
    pub statuses: Vec<StepStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub kind: StepKind,
    /// Connector type from the definition file (e.g. "Request", "Http").
    /// Opaque to the interpreter.
    pub step_type: String,
    /// Empty for actions that run directly after the trigger succeeds.
    pub run_after: Vec<DependsOn>,
}

impl StepDefinition {
    pub fn trigger(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StepKind::Trigger,
            step_type: "Request".to_string(),
            run_after: Vec::new(),
        }
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StepKind::Action,
            step_type: "Http".to_string(),
            run_after: Vec::new(),
        }
    }

    pub fn with_type(mut self, step_type: impl Into<String>) -> Self {
        self.step_type = step_type.into();
        self
    }

    pub fn after(mut self, step: impl Into<String>, statuses: &[StepStatus]) -> Self {
        self.run_after.push(DependsOn {
            step: step.into(),
            statuses: statuses.to_vec(),
        });
        self
    }

    pub fn after_succeeded(self, step: impl Into<String>) -> Self {
        self.after(step, &[StepStatus::Succeeded])
    }
}

/// A parsed workflow: exactly one trigger plus actions in declared order.
///
/// Read-only to the interpreter; build one through [`WorkflowParser`] or the
/// builder methods here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub trigger: StepDefinition,
    pub actions: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, trigger: StepDefinition) -> Self {
        Self {
            name: name.into(),
            trigger,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: StepDefinition) -> Self {
        self.actions.push(action);
        self
    }

    pub fn action(&self, name: &str) -> Option<&StepDefinition> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.action(name).is_some()
    }

    /// Actions no other action declares a dependency on.
    pub fn terminal_actions(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter(|a| {
                !self
                    .actions
                    .iter()
                    .any(|other| other.run_after.iter().any(|d| d.step == a.name))
            })
            .map(|a| a.name.clone())
            .collect()
    }
}

/// The recorded outcome of one executed (or skipped) step. Immutable once
/// recorded by the reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<mock::MockOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<mock::MockErrorInfo>,
}

impl StepResult {
    pub fn new(name: impl Into<String>, kind: StepKind, status: StepStatus) -> Self {
        Self {
            name: name.into(),
            kind,
            status,
            outputs: None,
            error: None,
        }
    }

    pub fn with_outputs(mut self, outputs: mock::MockOutput) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn with_error(mut self, error: mock::MockErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}

/// The final, immutable record of one workflow interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: StepStatus,
    /// Run-level error when the run was aborted mid-traversal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HarnessError>,
    pub step_results: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl TestRun {
    pub fn step_result(&self, name: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|r| r.name == name)
    }

    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}
