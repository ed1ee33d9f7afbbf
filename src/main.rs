use assistant_forge::browser::ChromeDriver;
use assistant_forge::config::{RunnerConfig, TargetConfiguration};
use assistant_forge::workflow::{RetrySupervisor, RunStatus, WorkflowOrchestrator};
use assistant_forge::SessionLifecycle;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Drive a browser to create or update a hosted assistant from a JSON
/// definition file.
#[derive(Parser, Debug)]
#[command(name = "assistant-forge", version, about)]
struct Args {
    /// Path to the assistant definition (JSON).
    config: PathBuf,

    /// Where to persist session cookies between runs.
    #[arg(long)]
    cookies_file: Option<PathBuf>,

    /// Run the browser without a visible window. Interactive login will
    /// not work headless, so this is useful only with warm cookies.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    // Definition problems are not retryable: fail before any browser starts.
    let target = TargetConfiguration::load(&args.config)?;
    let schema = target.load_openapi_schema()?;

    let mut runner = RunnerConfig::default();
    runner.browser.headless = args.headless;
    if let Some(path) = args.cookies_file {
        runner.cookies_file = path;
    }

    info!("Forging assistant: {}", target.name);

    let supervisor = RetrySupervisor::new(
        runner.timeouts.max_attempts,
        Duration::from_millis(runner.timeouts.retry_delay_ms),
    );
    let lifecycle = SessionLifecycle::new(runner.clone());
    let orchestrator = WorkflowOrchestrator::new(target, schema, runner);

    let status = supervisor
        .run(&lifecycle, &orchestrator, ChromeDriver::new)
        .await;

    match status {
        RunStatus::Succeeded(report) => {
            info!(
                handle = ?report.target,
                dialog = ?report.dialog,
                starters = report.starters_applied,
                "assistant saved"
            );
            println!("Assistant configuration completed successfully.");
            Ok(())
        }
        RunStatus::Failed(e) => {
            error!("Assistant configuration failed: {}", e);
            std::process::exit(1);
        }
    }
}
