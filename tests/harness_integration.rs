//! End-to-end harness tests mirroring the shape of a typical workflow unit
//! test: load the sample workflow, mock the trigger and the single action,
//! run, and assert on the finalized result.

mod common;

use serde_json::json;
use tempfile::TempDir;

use flowmock::error::HarnessError;
use flowmock::harness::WorkflowTestHarness;
use flowmock::workflow::{
    MockErrorInfo, MockOutput, MockSpec, StaticMock, StepKind, StepStatus, TestMockDefinition,
    WorkflowParser,
};

fn sample_harness() -> WorkflowTestHarness {
    let definition = WorkflowParser::new()
        .parse_file(common::fixture("sampleWorkflow/workflow.json"))
        .unwrap();
    WorkflowTestHarness::from_definition(definition)
}

#[tokio::test]
async fn test_execute_workflow_with_static_mocks_succeeds() {
    let trigger_mock = StaticMock::succeeded(MockOutput::default());
    let action_mock =
        StaticMock::succeeded(MockOutput::with_body(json!({"Name": "rg1"})));
    let mocks = TestMockDefinition::new(trigger_mock)
        .with_action("Read_a_resource_group", action_mock);

    let test_run = sample_harness().run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Succeeded);
    assert_eq!(test_run.step_results.len(), 2);
    assert_eq!(test_run.step_results[0].kind, StepKind::Trigger);
    assert_eq!(test_run.step_results[0].status, StepStatus::Succeeded);

    let action = test_run.step_result("Read_a_resource_group").unwrap();
    assert_eq!(action.status, StepStatus::Succeeded);
    assert_eq!(action.outputs.as_ref().unwrap().body, json!({"Name": "rg1"}));
}

#[tokio::test]
async fn test_execute_workflow_with_dynamic_mock_succeeds() {
    let trigger_mock = StaticMock::succeeded(MockOutput::with_body(json!({"Flag": true})));
    let action_mock = MockSpec::dynamic(|ctx| {
        // The trigger result is visible to the callback; shape the action
        // output from it.
        let flag = ctx
            .output_body("When_a_HTTP_request_is_received")
            .and_then(|body| body.get("Flag"))
            .cloned()
            .unwrap_or_default();
        MockSpec::Static(StaticMock::succeeded(MockOutput::with_body(
            json!({"Name": "rg1", "TriggeredBy": flag}),
        )))
    });
    let mocks = TestMockDefinition::new(trigger_mock)
        .with_action("Read_a_resource_group", action_mock);

    let test_run = sample_harness().run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Succeeded);
    let action = test_run.step_result("Read_a_resource_group").unwrap();
    assert_eq!(
        action.outputs.as_ref().unwrap().body,
        json!({"Name": "rg1", "TriggeredBy": true})
    );
}

#[tokio::test]
async fn test_failed_action_mock_fails_the_run() {
    let mocks = TestMockDefinition::new(StaticMock::succeeded(MockOutput::default()))
        .with_action(
            "Read_a_resource_group",
            StaticMock::with_status(StepStatus::Failed),
        );

    let test_run = sample_harness().run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Failed);
    let action = test_run.step_result("Read_a_resource_group").unwrap();
    assert_eq!(action.status, StepStatus::Failed);
    assert!(action.outputs.is_none());
    assert!(action.error.is_none());
}

#[tokio::test]
async fn test_action_error_info_is_preserved_on_the_result() {
    let mocks = TestMockDefinition::new(StaticMock::succeeded(MockOutput::default()))
        .with_action(
            "Read_a_resource_group",
            StaticMock::failed(MockErrorInfo::new(
                "ResourceGroupNotFound",
                "the resource group does not exist",
            )),
        );

    let test_run = sample_harness().run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Failed);
    let action = test_run.step_result("Read_a_resource_group").unwrap();
    assert_eq!(action.error.as_ref().unwrap().code, "ResourceGroupNotFound");
    assert!(action.outputs.is_none());
}

#[tokio::test]
async fn test_missing_action_mock_aborts_the_run() {
    let mocks = TestMockDefinition::new(StaticMock::succeeded(MockOutput::default()));

    let test_run = sample_harness().run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Aborted);
    assert_eq!(
        test_run.error,
        Some(HarnessError::unregistered_step("Read_a_resource_group"))
    );
}

#[tokio::test]
async fn test_mock_for_unknown_action_is_rejected_before_execution() {
    let mocks = TestMockDefinition::new(StaticMock::succeeded(MockOutput::default()))
        .with_action("Read_a_resource_group", StaticMock::succeeded(MockOutput::default()))
        .with_action("Ghost_action", StaticMock::succeeded(MockOutput::default()));

    let err = sample_harness().run_workflow(&mocks).await.unwrap_err();
    let harness_error = err.downcast_ref::<HarnessError>().unwrap();
    assert!(matches!(harness_error, HarnessError::Config { .. }));
}

#[tokio::test]
async fn test_harness_loads_workspace_from_settings_file() {
    let workspace = TempDir::new().unwrap();
    let (settings_path, mocks_path) = common::write_sample_workspace(workspace.path());

    let harness = WorkflowTestHarness::from_settings_file(&settings_path).unwrap();
    assert_eq!(harness.definition().name, "sampleWorkflow");

    let mocks = TestMockDefinition::from_fixture_file(&mocks_path).unwrap();
    let test_run = harness.run_workflow(&mocks).await.unwrap();

    assert_eq!(test_run.status, StepStatus::Succeeded);
    assert_eq!(
        test_run
            .step_result("Read_a_resource_group")
            .unwrap()
            .outputs
            .as_ref()
            .unwrap()
            .body["Name"],
        json!("rg1")
    );
}
