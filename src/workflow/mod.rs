//! The automation layer proper: strategy tables for a shifting UI, a fallback
//! action interpreter, the dialog state machine, the end-to-end orchestrator
//! and the retry supervisor that wraps every attempt in a fresh session.

pub mod dialog;
pub mod executor;
pub mod orchestrator;
pub mod plans;
pub mod supervisor;

pub use dialog::{DialogOutcome, DialogState, DialogStateMachine};
pub use executor::{ActionExecutor, ActionOutcome, ActionStrategy, Locator, UiAction};
pub use orchestrator::{TargetHandle, Workflow, WorkflowOrchestrator, WorkflowReport};
pub use supervisor::{RetrySupervisor, RunStatus};
