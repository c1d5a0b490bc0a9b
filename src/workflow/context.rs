//! Read-only snapshot of prior step results handed to dynamic mock callbacks.

use serde::Serialize;

use super::StepResult;

/// Valid only for the duration of one callback invocation. Exposes exactly
/// the results of the current step's ancestors, in traversal order — never
/// results from sibling or descendant steps.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    workflow_name: String,
    current_step: String,
    results: Vec<StepResult>,
}

impl ExecutionContext {
    pub(crate) fn new(
        workflow_name: impl Into<String>,
        current_step: impl Into<String>,
        results: Vec<StepResult>,
    ) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            current_step: current_step.into(),
            results,
        }
    }

    /// Context with no prior results, as seen by the trigger mock.
    pub fn empty(workflow_name: impl Into<String>, current_step: impl Into<String>) -> Self {
        Self::new(workflow_name, current_step, Vec::new())
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn step_results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn result(&self, step_name: &str) -> Option<&StepResult> {
        self.results.iter().find(|r| r.name == step_name)
    }

    /// Convenience accessor for the JSON body an ancestor produced.
    pub fn output_body(&self, step_name: &str) -> Option<&serde_json::Value> {
        self.result(step_name)
            .and_then(|r| r.outputs.as_ref())
            .map(|o| &o.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::mock::MockOutput;
    use crate::workflow::{StepKind, StepStatus};
    use serde_json::json;

    #[test]
    fn test_context_exposes_ancestor_outputs() {
        let result = StepResult::new("First", StepKind::Action, StepStatus::Succeeded)
            .with_outputs(MockOutput::with_body(json!({"Name": "rg1"})));
        let ctx = ExecutionContext::new("sample", "Second", vec![result]);

        assert_eq!(ctx.current_step(), "Second");
        assert_eq!(ctx.output_body("First"), Some(&json!({"Name": "rg1"})));
        assert!(ctx.result("Second").is_none());
    }
}
