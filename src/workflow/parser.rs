//! Parses Logic App style `workflow.json` files into a [`WorkflowDefinition`].
//!
//! Only the skeleton the interpreter needs is read: trigger and action names,
//! connector types, and `runAfter` edges. Everything else (inputs, schemas,
//! connection references) belongs to collaborators and is ignored here.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use super::graph::DependencyGraph;
use super::{DependsOn, StepDefinition, StepKind, StepStatus, WorkflowDefinition};

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    definition: DefinitionSection,
}

#[derive(Debug, Deserialize)]
struct DefinitionSection {
    #[serde(default)]
    triggers: IndexMap<String, RawStep>,
    #[serde(default)]
    actions: IndexMap<String, RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(rename = "type")]
    step_type: String,
    #[serde(default, rename = "runAfter")]
    run_after: IndexMap<String, Vec<StepStatus>>,
}

#[derive(Debug, Default)]
pub struct WorkflowParser;

impl WorkflowParser {
    pub fn new() -> Self {
        Self
    }

    /// The workflow takes its name from the containing directory, matching
    /// the `<workflow>/workflow.json` layout; the file stem is the fallback.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition> {
        let path = path.as_ref();
        let name = path
            .parent()
            .and_then(|p| p.file_name())
            .or_else(|| path.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workflow".to_string());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {path:?}"))?;
        self.parse_str(&content, &name)
    }

    pub fn parse_str(&self, content: &str, name: &str) -> Result<WorkflowDefinition> {
        let file: WorkflowFile =
            serde_json::from_str(content).context("Failed to parse workflow definition")?;

        let mut triggers = file.definition.triggers.into_iter();
        let (trigger_name, raw_trigger) = triggers
            .next()
            .context("Workflow must declare exactly one trigger")?;
        if triggers.next().is_some() {
            anyhow::bail!("Workflow must declare exactly one trigger");
        }
        if !raw_trigger.run_after.is_empty() {
            anyhow::bail!("Trigger '{trigger_name}' cannot declare runAfter dependencies");
        }

        let mut definition = WorkflowDefinition::new(
            name,
            StepDefinition {
                name: trigger_name,
                kind: StepKind::Trigger,
                step_type: raw_trigger.step_type,
                run_after: Vec::new(),
            },
        );

        for (action_name, raw) in file.definition.actions {
            if action_name == definition.trigger.name {
                anyhow::bail!("Action '{action_name}' reuses the trigger name");
            }
            let run_after = raw
                .run_after
                .into_iter()
                .map(|(step, statuses)| {
                    if statuses.is_empty() {
                        anyhow::bail!("Action '{action_name}' has an empty runAfter status list for '{step}'");
                    }
                    if let Some(bad) = statuses.iter().find(|s| !s.is_terminal()) {
                        anyhow::bail!(
                            "Action '{action_name}' runs after non-terminal status {bad:?} of '{step}'"
                        );
                    }
                    Ok(DependsOn { step, statuses })
                })
                .collect::<Result<Vec<_>>>()?;
            definition = definition.with_action(StepDefinition {
                name: action_name,
                kind: StepKind::Action,
                step_type: raw.step_type,
                run_after,
            });
        }

        self.validate(&definition)?;
        debug!(workflow = %definition.name, actions = definition.actions.len(), "parsed workflow definition");
        Ok(definition)
    }

    /// Structural checks beyond what serde enforces: unique step names,
    /// resolvable edges, acyclic graph.
    pub fn validate(&self, definition: &WorkflowDefinition) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        seen.insert(definition.trigger.name.as_str());
        for action in &definition.actions {
            if !seen.insert(action.name.as_str()) {
                anyhow::bail!("Duplicate step name '{}'", action.name);
            }
        }
        DependencyGraph::new(definition)
            .with_context(|| format!("Invalid workflow '{}'", definition.name))?;
        Ok(())
    }
}
