//! CLI argument structures and command implementations.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::harness::WorkflowTestHarness;
use crate::workflow::{TestMockDefinition, WorkflowParser};

/// Run declarative workflows against mocked triggers and actions
#[derive(Parser)]
#[command(name = "flowmock")]
#[command(about = "Deterministic unit-test runs for declarative workflows", long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow with static mocks from a fixture file
    Run {
        /// Path to the test settings file
        #[arg(short, long)]
        settings: PathBuf,

        /// Path to the mock fixture file (trigger + action mocks)
        #[arg(short, long)]
        mocks: PathBuf,
    },
    /// Parse and validate a workflow definition file
    Validate {
        /// Path to the workflow definition (workflow.json)
        #[arg(short, long)]
        workflow: PathBuf,
    },
}

pub async fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run { settings, mocks } => run(settings, mocks).await,
        Commands::Validate { workflow } => validate(workflow),
    }
}

async fn run(settings: PathBuf, mocks: PathBuf) -> Result<ExitCode> {
    let harness = WorkflowTestHarness::from_settings_file(&settings)?;
    let mock_definition = TestMockDefinition::from_fixture_file(&mocks)?;

    let test_run = harness.run_workflow(&mock_definition).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&test_run).context("Failed to serialize test run")?
    );

    Ok(if test_run.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn validate(workflow: PathBuf) -> Result<ExitCode> {
    let definition = WorkflowParser::new().parse_file(&workflow)?;
    debug!(workflow = %definition.name, "definition validated");
    println!(
        "workflow '{}': 1 trigger, {} action(s)",
        definition.name,
        definition.actions.len()
    );
    Ok(ExitCode::SUCCESS)
}
