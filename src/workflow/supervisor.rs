use crate::browser::driver::Driver;
use crate::browser::session::SessionLifecycle;
use crate::errors::AutomationError;
use crate::workflow::orchestrator::{Workflow, WorkflowReport};
use std::time::Duration;
use tracing::{error, info, warn};

/// Terminal result of a supervised run.
#[derive(Debug)]
pub enum RunStatus {
    /// One attempt ran to completion; the report says what it did.
    Succeeded(WorkflowReport),
    /// Every attempt failed. Holds the last error seen.
    Failed(AutomationError),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded(_))
    }
}

/// Runs a workflow up to a bounded number of attempts, each in a fresh
/// session. Teardown is unconditional: every session that opens is closed
/// before the next attempt starts, whatever the attempt did.
pub struct RetrySupervisor {
    max_attempts: u32,
    retry_delay: Duration,
}

impl RetrySupervisor {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub async fn run<D, W, F>(
        &self,
        lifecycle: &SessionLifecycle,
        workflow: &W,
        mut driver_factory: F,
    ) -> RunStatus
    where
        D: Driver,
        W: Workflow<D>,
        F: FnMut() -> D,
    {
        let mut last_error = AutomationError::NoActiveSession;
        for attempt in 1..=self.max_attempts {
            info!("Attempt {}/{}", attempt, self.max_attempts);

            let mut session = match lifecycle.open(driver_factory()).await {
                Ok(session) => session,
                Err(e) => {
                    warn!("Attempt {} could not open a session: {}", attempt, e);
                    last_error = e;
                    self.pause_before_retry(attempt).await;
                    continue;
                }
            };

            let result = workflow.execute(&mut session).await;
            lifecycle.close(&mut session).await;

            match result {
                Ok(report) => {
                    info!("Attempt {} succeeded", attempt);
                    return RunStatus::Succeeded(report);
                }
                Err(e) => {
                    error!("Attempt {} failed: {}", attempt, e);
                    last_error = e;
                    self.pause_before_retry(attempt).await;
                }
            }
        }
        error!("All {} attempts exhausted", self.max_attempts);
        RunStatus::Failed(last_error)
    }

    async fn pause_before_retry(&self, attempt: u32) {
        if attempt < self.max_attempts {
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
