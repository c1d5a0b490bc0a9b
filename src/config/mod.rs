//! Test settings: where the workflow under test lives on disk.
//!
//! Mirrors the conventional Logic App workspace layout. The settings file
//! supplies file paths only, never parsed workflow content; path resolution
//! stays out of the execution core.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token in `workspacePath` that defers to the `WS_ROOT` environment
/// variable, so the same settings file works locally and in CI.
pub const WS_ROOT_TOKEN: &str = "$(WS_ROOT)";
pub const WS_ROOT_ENV: &str = "WS_ROOT";

fn default_callback_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSettings {
    /// Workspace root holding the Logic App project, or the `$(WS_ROOT)`
    /// token.
    pub workspace_path: String,
    /// The Logic App folder name (e.g. `MyLogicApp`).
    pub logic_app_name: String,
    /// The workflow sub-folder name (e.g. `sampleWorkflow`).
    pub workflow_name: String,
    /// Budget for each dynamic mock callback.
    #[serde(default = "default_callback_timeout", with = "humantime_serde")]
    pub callback_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    test_settings: TestSettings,
}

impl TestSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read test settings: {:?}", path.as_ref()))?;
        let file: SettingsFile =
            serde_json::from_str(&content).context("Failed to parse test settings")?;
        Ok(file.test_settings)
    }

    /// A literal path passes through; the `$(WS_ROOT)` token resolves to the
    /// environment, falling back to the current directory.
    pub fn resolve_workspace_root(&self) -> Result<PathBuf> {
        let root = if self.workspace_path.eq_ignore_ascii_case(WS_ROOT_TOKEN) {
            match env::var(WS_ROOT_ENV) {
                Ok(value) => PathBuf::from(value),
                Err(_) => env::current_dir().context("Failed to resolve current directory")?,
            }
        } else {
            PathBuf::from(&self.workspace_path)
        };
        debug!(root = %root.display(), "resolved workspace root");
        Ok(root)
    }

    pub fn workflow_paths(&self) -> Result<WorkflowPaths> {
        let root = self.resolve_workspace_root()?;
        Ok(WorkflowPaths::new(
            &root,
            &self.logic_app_name,
            &self.workflow_name,
        ))
    }
}

/// Full paths to the JSON files the harness needs. Only `workflow` must
/// exist; the rest are optional collaborator files passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPaths {
    pub workflow: PathBuf,
    pub connections: PathBuf,
    pub parameters: PathBuf,
    pub local_settings: PathBuf,
}

impl WorkflowPaths {
    pub fn new(root: &Path, logic_app_name: &str, workflow_name: &str) -> Self {
        let app_dir = root.join(logic_app_name);
        Self {
            workflow: app_dir.join(workflow_name).join("workflow.json"),
            connections: app_dir.join("connections.json"),
            parameters: app_dir.join("parameters.json"),
            local_settings: app_dir.join("local.settings.json"),
        }
    }
}
