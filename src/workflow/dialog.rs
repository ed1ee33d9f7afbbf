use crate::browser::driver::Driver;
use crate::browser::session::Session;
use crate::workflow::executor::{js_string, ActionExecutor, UiAction};
use crate::workflow::plans;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DIALOG_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    Waiting,
    ShareFlow,
    UpdateConfirmed,
    Unrecognized,
}

/// Result of the post-save confirmation flow. Never fatal: once the save
/// control fired, the attempt is structurally complete whatever happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    /// The save control was never activated, so no dialog was expected.
    None,
    ShareFlowCompleted,
    UpdateConfirmed,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    Share,
    Update,
    Unknown,
}

/// Classifies whichever confirmation dialog appears after a save and drives
/// it to completion.
pub struct DialogStateMachine {
    state: DialogState,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl DialogStateMachine {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            state: DialogState::Idle,
            wait_timeout,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub async fn drive<D: Driver>(
        &mut self,
        session: &Session<D>,
        executor: &ActionExecutor,
    ) -> DialogOutcome {
        self.state = DialogState::Waiting;
        let outcome = match self.wait_for_signature(session).await {
            Some(Signature::Share) => {
                info!("Share dialog appeared (new assistant)");
                self.state = DialogState::ShareFlow;
                self.run_share_flow(session, executor).await;
                DialogOutcome::ShareFlowCompleted
            }
            Some(Signature::Update) => {
                info!("Update dialog appeared (existing assistant)");
                self.state = DialogState::UpdateConfirmed;
                self.run_confirmation(session, executor).await;
                DialogOutcome::UpdateConfirmed
            }
            Some(Signature::Unknown) => {
                warn!("A dialog appeared but matched no known signature");
                self.state = DialogState::Unrecognized;
                DialogOutcome::Unrecognized
            }
            None => {
                warn!("No recognized dialog appeared within the timeout");
                self.state = DialogState::Unrecognized;
                DialogOutcome::Unrecognized
            }
        };
        self.state = DialogState::Idle;
        outcome
    }

    async fn wait_for_signature<D: Driver>(&self, session: &Session<D>) -> Option<Signature> {
        let script = classify_script();
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            match session.evaluate(&script).await {
                Ok(result) => match result.as_str() {
                    Some("share") => return Some(Signature::Share),
                    Some("update") => return Some(Signature::Update),
                    Some("unknown") => return Some(Signature::Unknown),
                    _ => {}
                },
                Err(e) => debug!("Dialog classification failed: {}", e),
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// First-time creation: pick the most restrictive visibility, confirm,
    /// then run the shared terminal confirmation.
    async fn run_share_flow<D: Driver>(&self, session: &Session<D>, executor: &ActionExecutor) {
        let visibility = executor
            .perform(session, &plans::visibility_only_me(), &UiAction::Click)
            .await;
        if !visibility.applied() {
            warn!("Could not select the restricted visibility option");
        }
        let confirm = executor
            .perform(session, &plans::dialog_confirm(), &UiAction::Click)
            .await;
        if !confirm.applied() {
            warn!("Could not confirm the share dialog");
        }
        tokio::time::sleep(DIALOG_SETTLE).await;
        self.run_confirmation(session, executor).await;
    }

    /// Terminal confirmation: activate the "view created resource" control,
    /// tolerating its absence.
    async fn run_confirmation<D: Driver>(&self, session: &Session<D>, executor: &ActionExecutor) {
        tokio::time::sleep(DIALOG_SETTLE).await;
        let view = executor
            .perform(session, &plans::view_resource(), &UiAction::Click)
            .await;
        if !view.applied() {
            debug!("View control absent, continuing");
        }
    }
}

fn classify_script() -> String {
    format!(
        r#"
        (function() {{
            const hasText = (text) => Array.from(document.querySelectorAll('div'))
                .some(el => (el.textContent || '').includes(text));
            if (hasText({share})) return 'share';
            if (hasText({update})) return 'update';
            if (document.querySelector('div[role="dialog"]')) return 'unknown';
            return null;
        }})()
        "#,
        share = js_string(plans::SHARE_DIALOG_TEXT),
        update = js_string(plans::UPDATE_DIALOG_TEXT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open_fake_session, FakeDriver};
    use serde_json::json;

    fn machine() -> DialogStateMachine {
        DialogStateMachine::new(Duration::from_millis(50))
    }

    fn executor() -> ActionExecutor {
        ActionExecutor::new(Duration::from_millis(40), Duration::from_millis(20))
    }

    fn applied() -> serde_json::Value {
        json!({ "found": true, "applied": true })
    }

    #[tokio::test]
    async fn share_signature_runs_share_flow_with_one_visibility_click() {
        let driver = FakeDriver::new();
        driver.respond("Share GPT", json!("share"));
        driver.respond("only me", applied());
        driver.respond("save", applied());
        driver.respond("view gpt", applied());
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;

        let outcome = machine().drive(&session, &executor()).await;

        assert_eq!(outcome, DialogOutcome::ShareFlowCompleted);
        assert_eq!(handle.scripts_containing("only me"), 1);
        assert!(handle.scripts_containing("view gpt") >= 1);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn update_signature_skips_visibility_entirely() {
        let driver = FakeDriver::new();
        driver.respond("Share GPT", json!("update"));
        driver.respond("view gpt", applied());
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;

        let outcome = machine().drive(&session, &executor()).await;

        assert_eq!(outcome, DialogOutcome::UpdateConfirmed);
        assert_eq!(handle.scripts_containing("only me"), 0);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn silence_within_timeout_is_unrecognized() {
        let (lifecycle, mut session) = open_fake_session(FakeDriver::new()).await;
        let outcome = machine().drive(&session, &executor()).await;
        assert_eq!(outcome, DialogOutcome::Unrecognized);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn unknown_dialog_is_unrecognized() {
        let driver = FakeDriver::new();
        driver.respond("Share GPT", json!("unknown"));
        let (lifecycle, mut session) = open_fake_session(driver).await;
        let outcome = machine().drive(&session, &executor()).await;
        assert_eq!(outcome, DialogOutcome::Unrecognized);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn machine_returns_to_idle_after_driving() {
        let (lifecycle, mut session) = open_fake_session(FakeDriver::new()).await;
        let mut machine = machine();
        machine.drive(&session, &executor()).await;
        assert_eq!(machine.state(), DialogState::Idle);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn missing_view_control_is_tolerated() {
        let driver = FakeDriver::new();
        driver.respond("Share GPT", json!("update"));
        let (lifecycle, mut session) = open_fake_session(driver).await;
        let outcome = machine().drive(&session, &executor()).await;
        assert_eq!(outcome, DialogOutcome::UpdateConfirmed);
        lifecycle.close(&mut session).await;
    }
}
