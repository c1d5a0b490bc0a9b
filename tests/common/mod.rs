//! Shared helpers for integration tests: fixture paths and a disposable
//! Logic App style workspace.

use std::fs;
use std::path::{Path, PathBuf};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Lays out `<root>/MyLogicApp/sampleWorkflow/workflow.json` plus a settings
/// file and a mock fixture, and returns their paths.
pub fn write_sample_workspace(root: &Path) -> (PathBuf, PathBuf) {
    let workflow_dir = root.join("MyLogicApp").join("sampleWorkflow");
    fs::create_dir_all(&workflow_dir).unwrap();
    fs::copy(
        fixture("sampleWorkflow/workflow.json"),
        workflow_dir.join("workflow.json"),
    )
    .unwrap();

    let settings_path = root.join("testSettings.json");
    let settings = serde_json::json!({
        "testSettings": {
            "workspacePath": root.to_string_lossy(),
            "logicAppName": "MyLogicApp",
            "workflowName": "sampleWorkflow"
        }
    });
    fs::write(&settings_path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

    let mocks_path = root.join("mocks.json");
    fs::copy(fixture("sampleWorkflow/mocks.json"), &mocks_path).unwrap();

    (settings_path, mocks_path)
}
