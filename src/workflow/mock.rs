//! Mock specifications and the per-run mock registry.
//!
//! A mock stands in for a step's real execution: either a fixed status plus
//! outputs or error ([`StaticMock`]), or a callback that computes one from
//! the current [`ExecutionContext`] at step-execution time. One generic
//! payload type ([`MockOutput`]) replaces per-action generated output
//! classes: a status code plus an arbitrary JSON body.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::context::ExecutionContext;
use super::{StepDefinition, StepKind, StepStatus, WorkflowDefinition};
use crate::error::HarnessError;

/// Generic structured payload returned by a mocked step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockOutput {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

fn default_status_code() -> u16 {
    200
}

impl Default for MockOutput {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: HashMap::new(),
            body: serde_json::Value::Null,
        }
    }
}

impl MockOutput {
    pub fn with_body(body: serde_json::Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }
}

/// Error payload a mocked step reports instead of outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockErrorInfo {
    pub code: String,
    pub message: String,
}

impl MockErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A fully resolved mock: fixed status plus outputs or error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMock {
    #[serde(default = "default_mock_status")]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<MockOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MockErrorInfo>,
}

fn default_mock_status() -> StepStatus {
    StepStatus::Succeeded
}

impl StaticMock {
    pub fn succeeded(outputs: MockOutput) -> Self {
        Self {
            status: StepStatus::Succeeded,
            outputs: Some(outputs),
            error: None,
        }
    }

    pub fn with_status(status: StepStatus) -> Self {
        Self {
            status,
            outputs: None,
            error: None,
        }
    }

    pub fn failed(error: MockErrorInfo) -> Self {
        Self {
            status: StepStatus::Failed,
            outputs: None,
            error: Some(error),
        }
    }

    /// Constructor overloads cannot set both sides, but a deserialized
    /// fixture or a callback result can; checked once per resolution.
    pub(crate) fn validate(&self, step: &str) -> Result<(), HarnessError> {
        if self.outputs.is_some() && self.error.is_some() {
            return Err(HarnessError::invalid_mock(
                step,
                "outputs and error are mutually exclusive",
            ));
        }
        if !self.status.is_terminal() {
            return Err(HarnessError::invalid_mock(
                step,
                format!("non-terminal mock status {:?}", self.status),
            ));
        }
        Ok(())
    }
}

/// Callback invoked lazily at step-execution time for dynamic mocks.
pub type MockCallback = Arc<dyn Fn(&ExecutionContext) -> MockSpec + Send + Sync>;

/// A mock specification: static data or a dynamic callback.
///
/// The callback must itself resolve to a `Static` variant; nesting dynamic
/// mocks is rejected at resolution time.
#[derive(Clone)]
pub enum MockSpec {
    Static(StaticMock),
    Dynamic(MockCallback),
}

impl MockSpec {
    pub fn dynamic<F>(callback: F) -> Self
    where
        F: Fn(&ExecutionContext) -> MockSpec + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(callback))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl From<StaticMock> for MockSpec {
    fn from(mock: StaticMock) -> Self {
        Self::Static(mock)
    }
}

impl fmt::Debug for MockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(mock) => f.debug_tuple("Static").field(mock).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<callback>)"),
        }
    }
}

/// Fixture file shape: one trigger mock plus named action mocks. Only static
/// mocks can come from a file; dynamic mocks are built in code.
#[derive(Debug, Deserialize)]
struct MockFixture {
    trigger: StaticMock,
    #[serde(default)]
    actions: HashMap<String, StaticMock>,
}

/// The caller-supplied bundle of mocks for one run: a trigger mock plus a
/// mapping from action name to mock.
#[derive(Debug, Clone)]
pub struct TestMockDefinition {
    trigger: MockSpec,
    actions: HashMap<String, MockSpec>,
}

impl TestMockDefinition {
    pub fn new(trigger: impl Into<MockSpec>) -> Self {
        Self {
            trigger: trigger.into(),
            actions: HashMap::new(),
        }
    }

    pub fn with_action(mut self, name: impl Into<String>, mock: impl Into<MockSpec>) -> Self {
        self.actions.insert(name.into(), mock.into());
        self
    }

    pub fn trigger(&self) -> &MockSpec {
        &self.trigger
    }

    pub fn action(&self, name: &str) -> Option<&MockSpec> {
        self.actions.get(name)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn from_fixture_str(content: &str) -> Result<Self> {
        let fixture: MockFixture =
            serde_json::from_str(content).context("Failed to parse mock fixture")?;
        let mut definition = Self::new(fixture.trigger);
        for (name, mock) in fixture.actions {
            definition = definition.with_action(name, mock);
        }
        Ok(definition)
    }

    pub fn from_fixture_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read mock fixture: {:?}", path.as_ref()))?;
        Self::from_fixture_str(&content)
    }
}

/// Per-run mock store keyed by step name.
///
/// Construction cross-checks the mock keys against the workflow definition
/// so unresolved references surface before execution starts.
#[derive(Debug, Clone)]
pub struct MockRegistry {
    trigger: MockSpec,
    actions: HashMap<String, MockSpec>,
}

impl MockRegistry {
    pub fn from_definition(
        mocks: &TestMockDefinition,
        definition: &WorkflowDefinition,
    ) -> Result<Self, HarnessError> {
        for name in mocks.action_names() {
            if !definition.has_action(name) {
                return Err(HarnessError::config(format!(
                    "mock '{}' does not match any action in workflow '{}'",
                    name, definition.name
                )));
            }
        }
        Ok(Self {
            trigger: mocks.trigger.clone(),
            actions: mocks.actions.clone(),
        })
    }

    /// Replaces any existing mock registered under the same step name.
    pub fn register(&mut self, step_name: impl Into<String>, spec: MockSpec) {
        self.actions.insert(step_name.into(), spec);
    }

    pub(crate) fn spec_for(&self, step: &StepDefinition) -> Result<&MockSpec, HarnessError> {
        match step.kind {
            StepKind::Trigger => Ok(&self.trigger),
            StepKind::Action => self
                .actions
                .get(&step.name)
                .ok_or_else(|| HarnessError::unregistered_step(&step.name)),
        }
    }

    /// Resolves the spec for `step` to a static mock, invoking a dynamic
    /// callback exactly once with the supplied context.
    pub fn resolve(
        &self,
        step: &StepDefinition,
        ctx: &ExecutionContext,
    ) -> Result<StaticMock, HarnessError> {
        let resolved = match self.spec_for(step)? {
            MockSpec::Static(mock) => mock.clone(),
            MockSpec::Dynamic(callback) => match callback(ctx) {
                MockSpec::Static(mock) => mock,
                MockSpec::Dynamic(_) => {
                    return Err(HarnessError::invalid_mock(
                        &step.name,
                        "callback returned another dynamic mock",
                    ));
                }
            },
        };
        resolved.validate(&step.name)?;
        Ok(resolved)
    }
}
