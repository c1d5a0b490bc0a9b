//! The workflow interpreter: walks the declarative graph and resolves every
//! step from the mock registry instead of performing real I/O.
//!
//! One run executes on one logical thread of control. Dynamic mock callbacks
//! run on a blocking thread under a per-run timeout so a misbehaving
//! callback cannot stall the run indefinitely.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::context::ExecutionContext;
use super::graph::DependencyGraph;
use super::mock::{MockRegistry, StaticMock, TestMockDefinition};
use super::report::RunReporter;
use super::{StepDefinition, StepKind, StepResult, StepStatus, TestRun, WorkflowDefinition};
use crate::error::HarnessError;

const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooperative cancellation flag shared between the caller and a run.
///
/// Cancellation is checked between steps: steps not yet started are recorded
/// as Cancelled and the run finalizes with status Cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run knobs. `callback_timeout` bounds each dynamic mock callback.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub callback_timeout: Duration,
    pub cancel: CancelToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            callback_timeout: DEFAULT_CALLBACK_TIMEOUT,
            cancel: CancelToken::new(),
        }
    }
}

#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Runs the workflow against the supplied mocks. `Err` is reserved for
    /// pre-flight configuration problems; anything that goes wrong after the
    /// run started is reported through the returned [`TestRun`].
    async fn run(
        &self,
        definition: &WorkflowDefinition,
        mocks: &TestMockDefinition,
    ) -> Result<TestRun, HarnessError>;
}

#[derive(Debug, Default)]
pub struct WorkflowInterpreter {
    options: RunOptions,
}

impl WorkflowInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn with_callback_timeout(mut self, callback_timeout: Duration) -> Self {
        self.options.callback_timeout = callback_timeout;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.options.cancel = cancel;
        self
    }

    /// Static mocks resolve inline; dynamic callbacks run on a blocking
    /// thread under the configured budget.
    async fn resolve_step(
        &self,
        registry: &MockRegistry,
        step: &StepDefinition,
        ctx: ExecutionContext,
    ) -> Result<StaticMock, HarnessError> {
        if !registry.spec_for(step)?.is_dynamic() {
            return registry.resolve(step, &ctx);
        }

        let budget = self.options.callback_timeout;
        let registry = registry.clone();
        let step_for_callback = step.clone();
        let handle = task::spawn_blocking(move || registry.resolve(&step_for_callback, &ctx));

        match timeout(budget, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(HarnessError::invalid_mock(
                &step.name,
                format!("mock callback panicked: {join_error}"),
            )),
            Err(_elapsed) => Err(HarnessError::CallbackTimeout {
                step: step.name.clone(),
                budget_ms: budget.as_millis() as u64,
            }),
        }
    }
}

fn step_result_from(step: &StepDefinition, mock: StaticMock) -> StepResult {
    StepResult {
        name: step.name.clone(),
        kind: step.kind,
        status: mock.status,
        outputs: mock.outputs,
        error: mock.error,
    }
}

fn abort_status(error: &HarnessError) -> StepStatus {
    match error {
        HarnessError::CallbackTimeout { .. } => StepStatus::TimedOut,
        _ => StepStatus::Aborted,
    }
}

#[async_trait]
impl WorkflowRunner for WorkflowInterpreter {
    async fn run(
        &self,
        definition: &WorkflowDefinition,
        mocks: &TestMockDefinition,
    ) -> Result<TestRun, HarnessError> {
        let registry = MockRegistry::from_definition(mocks, definition)?;
        let graph = DependencyGraph::new(definition)?;
        let mut reporter = RunReporter::new(&definition.name, definition.terminal_actions());

        info!(workflow = %definition.name, "starting mocked workflow run");

        // The trigger resolves against an empty context; anything other than
        // success ends the run before any action executes.
        let trigger = &definition.trigger;
        let ctx = ExecutionContext::empty(&definition.name, &trigger.name);
        let trigger_result = match self.resolve_step(&registry, trigger, ctx).await {
            Ok(mock) => step_result_from(trigger, mock),
            Err(error) => {
                reporter.record(StepResult::new(
                    &trigger.name,
                    StepKind::Trigger,
                    abort_status(&error),
                ))?;
                reporter.abort(error);
                return Ok(reporter.finalize());
            }
        };
        let trigger_status = trigger_result.status;
        reporter.record(trigger_result.clone())?;
        if trigger_status != StepStatus::Succeeded {
            warn!(workflow = %definition.name, status = ?trigger_status, "trigger mock did not succeed");
            return Ok(reporter.finalize());
        }

        let mut statuses: HashMap<usize, StepStatus> = HashMap::new();
        let mut recorded_actions: Vec<(usize, StepResult)> = Vec::new();

        for index in graph.traversal_order() {
            let step = &definition.actions[index];

            if self.options.cancel.is_cancelled() {
                debug!(step = %step.name, "run cancelled before step started");
                let result = StepResult::new(&step.name, StepKind::Action, StepStatus::Cancelled);
                statuses.insert(index, StepStatus::Cancelled);
                reporter.record(result.clone())?;
                recorded_actions.push((index, result));
                continue;
            }

            // An action runs only when every predecessor finished with one
            // of the statuses declared on the edge; otherwise it is skipped,
            // and the skip propagates through the same gate.
            let runnable = step.run_after.iter().all(|dep| {
                definition
                    .actions
                    .iter()
                    .position(|a| a.name == dep.step)
                    .and_then(|i| statuses.get(&i))
                    .map(|status| dep.statuses.contains(status))
                    .unwrap_or(false)
            });
            if !runnable {
                let result = StepResult::new(&step.name, StepKind::Action, StepStatus::Skipped);
                statuses.insert(index, StepStatus::Skipped);
                reporter.record(result.clone())?;
                recorded_actions.push((index, result));
                continue;
            }

            debug!(step = %step.name, "step running");
            let ancestors = graph.ancestors(index);
            let mut visible = Vec::with_capacity(ancestors.len() + 1);
            visible.push(trigger_result.clone());
            for (i, result) in &recorded_actions {
                if ancestors.contains(i) {
                    visible.push(result.clone());
                }
            }
            let ctx = ExecutionContext::new(&definition.name, &step.name, visible);

            match self.resolve_step(&registry, step, ctx).await {
                Ok(mock) => {
                    let result = step_result_from(step, mock);
                    statuses.insert(index, result.status);
                    reporter.record(result.clone())?;
                    recorded_actions.push((index, result));
                }
                Err(error) => {
                    warn!(step = %step.name, %error, "run aborted");
                    reporter.record(StepResult::new(
                        &step.name,
                        StepKind::Action,
                        abort_status(&error),
                    ))?;
                    reporter.abort(error);
                    return Ok(reporter.finalize());
                }
            }
        }

        Ok(reporter.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::mock::{MockOutput, MockSpec};
    use serde_json::json;

    fn linear_definition() -> WorkflowDefinition {
        WorkflowDefinition::new("sample", StepDefinition::trigger("Trigger"))
            .with_action(StepDefinition::action("First"))
            .with_action(StepDefinition::action("Second").after_succeeded("First"))
    }

    #[tokio::test]
    async fn test_trigger_failure_short_circuits() {
        let mocks = TestMockDefinition::new(StaticMock::with_status(StepStatus::Failed))
            .with_action("First", StaticMock::with_status(StepStatus::Succeeded))
            .with_action("Second", StaticMock::with_status(StepStatus::Succeeded));

        let run = WorkflowInterpreter::new()
            .run(&linear_definition(), &mocks)
            .await
            .unwrap();

        assert_eq!(run.status, StepStatus::Failed);
        assert_eq!(run.step_results.len(), 1);
        assert_eq!(run.step_results[0].kind, StepKind::Trigger);
    }

    #[tokio::test]
    async fn test_dynamic_callback_sees_only_ancestors() {
        let definition = WorkflowDefinition::new("branches", StepDefinition::trigger("Trigger"))
            .with_action(StepDefinition::action("Left"))
            .with_action(StepDefinition::action("Right"))
            .with_action(StepDefinition::action("AfterLeft").after_succeeded("Left"));

        let mocks = TestMockDefinition::new(StaticMock::with_status(StepStatus::Succeeded))
            .with_action(
                "Left",
                StaticMock::succeeded(MockOutput::with_body(json!({"side": "left"}))),
            )
            .with_action("Right", StaticMock::with_status(StepStatus::Succeeded))
            .with_action(
                "AfterLeft",
                MockSpec::dynamic(|ctx| {
                    assert_eq!(ctx.current_step(), "AfterLeft");
                    assert!(ctx.result("Left").is_some());
                    assert!(ctx.result("Trigger").is_some());
                    // Sibling branch must be invisible.
                    assert!(ctx.result("Right").is_none());
                    MockSpec::Static(StaticMock::succeeded(MockOutput::with_body(
                        ctx.output_body("Left").cloned().unwrap_or_default(),
                    )))
                }),
            );

        let run = WorkflowInterpreter::new().run(&definition, &mocks).await.unwrap();

        assert_eq!(run.status, StepStatus::Succeeded);
        assert_eq!(
            run.step_result("AfterLeft").unwrap().outputs.as_ref().unwrap().body,
            json!({"side": "left"})
        );
    }

    #[tokio::test]
    async fn test_unregistered_mock_aborts_run() {
        let mocks = TestMockDefinition::new(StaticMock::with_status(StepStatus::Succeeded))
            .with_action("First", StaticMock::with_status(StepStatus::Succeeded));

        let run = WorkflowInterpreter::new()
            .run(&linear_definition(), &mocks)
            .await
            .unwrap();

        assert_eq!(run.status, StepStatus::Aborted);
        assert_eq!(run.error, Some(HarnessError::unregistered_step("Second")));
        assert_eq!(run.step_result("Second").unwrap().status, StepStatus::Aborted);
    }

    #[tokio::test]
    async fn test_cancelled_run_records_unstarted_steps_cancelled() {
        let cancel = CancelToken::new();
        let trigger_cancel = cancel.clone();
        let mocks = TestMockDefinition::new(StaticMock::with_status(StepStatus::Succeeded))
            .with_action(
                "First",
                MockSpec::dynamic(move |_ctx| {
                    trigger_cancel.cancel();
                    MockSpec::Static(StaticMock::with_status(StepStatus::Succeeded))
                }),
            )
            .with_action("Second", StaticMock::with_status(StepStatus::Succeeded));

        let run = WorkflowInterpreter::new()
            .with_cancel_token(cancel)
            .run(&linear_definition(), &mocks)
            .await
            .unwrap();

        assert_eq!(run.status, StepStatus::Cancelled);
        assert_eq!(run.step_result("First").unwrap().status, StepStatus::Succeeded);
        assert_eq!(run.step_result("Second").unwrap().status, StepStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_slow_callback_times_out() {
        let definition = WorkflowDefinition::new("slow", StepDefinition::trigger("Trigger"))
            .with_action(StepDefinition::action("Slow"));
        let mocks = TestMockDefinition::new(StaticMock::with_status(StepStatus::Succeeded))
            .with_action(
                "Slow",
                MockSpec::dynamic(|_ctx| {
                    std::thread::sleep(Duration::from_millis(250));
                    MockSpec::Static(StaticMock::with_status(StepStatus::Succeeded))
                }),
            );

        let run = WorkflowInterpreter::new()
            .with_callback_timeout(Duration::from_millis(25))
            .run(&definition, &mocks)
            .await
            .unwrap();

        assert_eq!(run.status, StepStatus::TimedOut);
        assert!(matches!(
            run.error,
            Some(HarnessError::CallbackTimeout { ref step, .. }) if step == "Slow"
        ));
        assert_eq!(run.step_result("Slow").unwrap().status, StepStatus::TimedOut);
    }
}
