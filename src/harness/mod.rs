//! Caller-facing test driver: loads a workflow definition from the
//! workspace layout, takes a bundle of mocks, and hands back the finalized
//! [`TestRun`] for assertions.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{TestSettings, WorkflowPaths};
use crate::workflow::{
    CancelToken, RunOptions, TestMockDefinition, TestRun, WorkflowDefinition, WorkflowInterpreter,
    WorkflowParser, WorkflowRunner,
};

pub struct WorkflowTestHarness {
    definition: WorkflowDefinition,
    options: RunOptions,
}

impl WorkflowTestHarness {
    /// Builds a harness from a settings file, resolving the workspace layout
    /// and parsing `workflow.json`.
    pub fn from_settings_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = TestSettings::load(path)?;
        let paths = settings.workflow_paths()?;
        let mut harness = Self::from_paths(&paths)?;
        harness.options.callback_timeout = settings.callback_timeout;
        Ok(harness)
    }

    pub fn from_paths(paths: &WorkflowPaths) -> Result<Self> {
        let definition = WorkflowParser::new()
            .parse_file(&paths.workflow)
            .with_context(|| format!("Failed to load workflow from {:?}", paths.workflow))?;
        Ok(Self::from_definition(definition))
    }

    pub fn from_definition(definition: WorkflowDefinition) -> Self {
        Self {
            definition,
            options: RunOptions::default(),
        }
    }

    pub fn with_callback_timeout(mut self, callback_timeout: Duration) -> Self {
        self.options.callback_timeout = callback_timeout;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.options.cancel = cancel;
        self
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Runs the workflow against the supplied mocks, awaited as one unit.
    pub async fn run_workflow(&self, mocks: &TestMockDefinition) -> Result<TestRun> {
        let runner = WorkflowInterpreter::with_options(self.options.clone());
        self.run_workflow_with(&runner, mocks).await
    }

    /// Same as [`run_workflow`](Self::run_workflow) with a caller-supplied
    /// runner implementation.
    pub async fn run_workflow_with(
        &self,
        runner: &dyn WorkflowRunner,
        mocks: &TestMockDefinition,
    ) -> Result<TestRun> {
        let run = runner
            .run(&self.definition, mocks)
            .await
            .with_context(|| format!("Failed to run workflow '{}'", self.definition.name))?;
        info!(
            workflow = %self.definition.name,
            run_id = %run.run_id,
            status = ?run.status,
            "workflow run finished"
        );
        Ok(run)
    }
}
