use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use flowmock::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    match cli::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {e}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
