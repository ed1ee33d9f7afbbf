pub mod browser;
pub mod config;
pub mod errors;
pub mod testing;
pub mod workflow;

pub use browser::{ChromeDriver, CookieStore, Driver, HealthMonitor, Session, SessionLifecycle};
pub use config::{RunnerConfig, TargetConfiguration};
pub use errors::{AutomationError, Result};
pub use workflow::{
    DialogOutcome, RetrySupervisor, RunStatus, TargetHandle, Workflow, WorkflowOrchestrator,
    WorkflowReport,
};
