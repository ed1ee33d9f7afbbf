use crate::browser::driver::Driver;
use crate::browser::health::HealthMonitor;
use crate::browser::session::Session;
use crate::config::{RunnerConfig, TargetConfiguration};
use crate::errors::{AutomationError, Result};
use crate::workflow::dialog::{DialogOutcome, DialogStateMachine};
use crate::workflow::executor::{js_string, ActionExecutor, ActionOutcome, ActionStrategy, UiAction};
use crate::workflow::plans;
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const READY_SCRIPT: &str = "document.readyState === 'complete'";

/// Where the lookup step left us relative to the target resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetHandle {
    /// No existing resource matched; a new one will be created.
    NoneFound,
    /// The resource lives at a known editor address. The listing lookup has
    /// no way to learn one, so today this comes only from a caller that
    /// recorded the editor URL out of band (for example from a prior run).
    KnownLocation(String),
    /// The UI is already positioned on the resource's editor.
    AlreadyPositioned,
}

/// What one attempt actually did. `Ok(report)` means the attempt ran to its
/// terminal state; how much of the form stuck is observability detail.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub target: TargetHandle,
    pub save: ActionOutcome,
    pub dialog: DialogOutcome,
    pub skipped_fields: Vec<&'static str>,
    pub starters_applied: usize,
}

/// Seam between the retry supervisor and the concrete workflow.
#[async_trait]
pub trait Workflow<D: Driver>: Send + Sync {
    async fn execute(&self, session: &mut Session<D>) -> Result<WorkflowReport>;
}

/// Sequences login → locate → fill → save → confirm over one session.
///
/// Failure policy: `SessionCrashed` and `LoginTimeout` propagate unchanged;
/// every other step-local failure is logged and the workflow moves on. The
/// point is to maximize the chance of reaching the save despite a shifting
/// UI, not to guarantee every field was set.
pub struct WorkflowOrchestrator {
    target: TargetConfiguration,
    schema: Option<Value>,
    runner: RunnerConfig,
    executor: ActionExecutor,
    health: HealthMonitor,
}

impl WorkflowOrchestrator {
    pub fn new(target: TargetConfiguration, schema: Option<Value>, runner: RunnerConfig) -> Self {
        let executor = ActionExecutor::from_config(&runner.timeouts);
        let health = HealthMonitor::new(Duration::from_millis(runner.timeouts.health_ms));
        Self {
            target,
            schema,
            runner,
            executor,
            health,
        }
    }

    /// Bounded wait for the document to report complete, then a short fixed
    /// settle. Best-effort: a page that never settles is caught by the next
    /// health check or selector wait, not here.
    async fn settle<D: Driver>(&self, session: &Session<D>) {
        let deadline = Instant::now() + Duration::from_millis(self.runner.timeouts.navigation_ms);
        loop {
            if let Ok(result) = session.evaluate(READY_SCRIPT).await {
                if result.as_bool() == Some(true) {
                    break;
                }
            }
            if Instant::now() >= deadline {
                debug!("Page did not report complete before the deadline");
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tokio::time::sleep(Duration::from_millis(self.runner.timeouts.settle_ms)).await;
    }

    async fn login<D: Driver>(&self, session: &Session<D>) -> Result<()> {
        info!("Navigating to {}", self.runner.app.root_url);
        session.navigate(&self.runner.app.root_url).await?;
        self.settle(session).await;
        self.health.ensure_alive(session).await?;

        let login_visible = self
            .executor
            .wait_for(
                session,
                &plans::login_button(),
                Duration::from_millis(self.runner.timeouts.element_fallback_ms),
            )
            .await;
        if !login_visible {
            info!("Already logged in");
            return Ok(());
        }

        let clicked = self
            .executor
            .perform(
                session,
                &ActionStrategy::new("login", vec![plans::login_button()]),
                &UiAction::Click,
            )
            .await;
        if !clicked.applied() {
            warn!("Login affordance vanished before it could be activated");
        }

        info!("Complete the login in the browser window; a challenge may appear");
        let logged_in = self
            .executor
            .wait_for(
                session,
                &plans::profile_marker(),
                Duration::from_millis(self.runner.timeouts.login_ms),
            )
            .await;
        if !logged_in {
            return Err(AutomationError::LoginTimeout);
        }
        self.health.ensure_alive(session).await?;
        info!("Login successful");
        Ok(())
    }

    async fn locate<D: Driver>(&self, session: &Session<D>) -> Result<TargetHandle> {
        info!("Looking for existing assistant: {}", self.target.name);
        session.navigate(&self.runner.app.listing_url).await?;
        self.settle(session).await;
        self.health.ensure_alive(session).await?;

        let texts: Vec<String> = match session.evaluate(&containers_script()).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(e) => {
                debug!("Container enumeration failed: {}", e);
                Vec::new()
            }
        };

        let needle = self.target.name.to_lowercase();
        let Some(index) = texts.iter().position(|t| t.to_lowercase().contains(&needle)) else {
            info!("No existing assistant found");
            return Ok(TargetHandle::NoneFound);
        };

        match session.evaluate(&edit_click_script(index)).await {
            Ok(result) if applied(&result) => {
                info!("Opened the existing assistant's editor");
                tokio::time::sleep(Duration::from_millis(self.runner.timeouts.settle_ms)).await;
                Ok(TargetHandle::AlreadyPositioned)
            }
            _ => {
                warn!("Matched a container but found no clickable control in it");
                Ok(TargetHandle::NoneFound)
            }
        }
    }

    async fn position<D: Driver>(&self, session: &Session<D>, target: &TargetHandle) -> Result<()> {
        match target {
            TargetHandle::NoneFound => {
                info!("Creating a new assistant");
                session.navigate(&self.runner.app.editor_url).await?;
                self.settle(session).await;
            }
            TargetHandle::KnownLocation(url) => {
                info!("Updating assistant at {}", url);
                session.navigate(url).await?;
                self.settle(session).await;
            }
            TargetHandle::AlreadyPositioned => {
                self.settle(session).await;
            }
        }
        self.health.ensure_alive(session).await
    }

    async fn fill<D: Driver>(
        &self,
        session: &Session<D>,
    ) -> Result<(Vec<&'static str>, usize)> {
        // Idempotent: clicking the configure tab when already active is
        // harmless, and its absence means we are already in configure mode.
        let _ = self
            .executor
            .perform(session, &plans::configure_tab(), &UiAction::Click)
            .await;

        let mut skipped = Vec::new();
        let fields = [
            (plans::name_field(), &self.target.name),
            (plans::description_field(), &self.target.description),
            (plans::instructions_field(), &self.target.instructions),
        ];
        for (strategy, value) in fields {
            let name = strategy.name;
            let outcome = self
                .executor
                .perform(session, &strategy, &UiAction::Fill(value.clone()))
                .await;
            if !outcome.applied() {
                skipped.push(name);
            }
        }
        self.health.ensure_alive(session).await?;

        let starters_applied = self.fill_starters(session).await;
        self.health.ensure_alive(session).await?;

        if let Some(schema) = &self.schema {
            self.configure_integration(session, schema).await?;
        }

        Ok((skipped, starters_applied))
    }

    async fn fill_starters<D: Driver>(&self, session: &Session<D>) -> usize {
        let starters = self.target.starters();
        if starters.is_empty() {
            return 0;
        }
        let section_present = self
            .executor
            .wait_for(
                session,
                &plans::starters_section(),
                Duration::from_millis(self.runner.timeouts.element_ms),
            )
            .await;
        if !section_present {
            warn!("Conversation starters section not found, skipping");
            return 0;
        }

        let mut count = 0;
        for (slot, starter) in starters.iter().enumerate() {
            match session.evaluate(&starter_slot_script(slot, starter)).await {
                Ok(result) if applied(&result) => count += 1,
                Ok(_) => debug!("No input available for starter slot {}", slot),
                Err(e) => debug!("Starter slot {} failed: {}", slot, e),
            }
        }
        info!("Applied {} conversation starters", count);
        count
    }

    async fn configure_integration<D: Driver>(
        &self,
        session: &Session<D>,
        schema: &Value,
    ) -> Result<()> {
        info!("Configuring integration schema");

        let section_present = self
            .executor
            .wait_for(
                session,
                &plans::actions_section(),
                Duration::from_millis(self.runner.timeouts.element_ms),
            )
            .await;
        if !section_present {
            warn!("Integrations section not found, skipping schema");
            return Ok(());
        }

        // Prefer the first existing entry; otherwise create one. A button
        // whose text cannot be read still counts as an existing entry.
        let deadline = Instant::now() + Duration::from_millis(self.runner.timeouts.element_ms);
        let mut selected = false;
        loop {
            match session.evaluate(&select_integration_script()).await {
                Ok(result) if applied(&result) => {
                    let existing = result
                        .get("existing")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    if existing {
                        info!("Reusing an existing integration entry");
                    } else {
                        info!("Creating a new integration entry");
                    }
                    selected = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => debug!("Integration section probe failed: {}", e),
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if !selected {
            warn!("Integrations section not usable, skipping schema");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(self.runner.timeouts.settle_ms)).await;

        let serialized = serde_json::to_string_pretty(schema)?;
        let filled = self
            .executor
            .perform(session, &plans::schema_editor(), &UiAction::Fill(serialized))
            .await;
        if !filled.applied() {
            warn!("Schema editor could not be resolved");
        }

        // Best-effort: the sub-entity save control is not always present.
        let _ = self
            .executor
            .perform(session, &plans::action_save_button(), &UiAction::Click)
            .await;

        self.health.ensure_alive(session).await
    }

    async fn save<D: Driver>(&self, session: &Session<D>) -> (ActionOutcome, DialogOutcome) {
        let save = self
            .executor
            .perform(session, &plans::save_button(), &UiAction::Click)
            .await;
        let dialog = if save.applied() {
            let mut machine =
                DialogStateMachine::new(Duration::from_millis(self.runner.timeouts.dialog_ms));
            machine.drive(session, &self.executor).await
        } else {
            warn!("Save control could not be resolved");
            DialogOutcome::None
        };
        (save, dialog)
    }
}

#[async_trait]
impl<D: Driver> Workflow<D> for WorkflowOrchestrator {
    async fn execute(&self, session: &mut Session<D>) -> Result<WorkflowReport> {
        self.login(session).await?;
        let target = self.locate(session).await?;
        self.position(session, &target).await?;
        let (skipped_fields, starters_applied) = self.fill(session).await?;
        let (save, dialog) = self.save(session).await;

        info!(
            handle = ?target,
            ?save,
            ?dialog,
            starters = starters_applied,
            skipped = ?skipped_fields,
            "workflow attempt completed"
        );
        Ok(WorkflowReport {
            target,
            save,
            dialog,
            skipped_fields,
            starters_applied,
        })
    }
}

fn applied(result: &Value) -> bool {
    result
        .get("applied")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn containers_script() -> String {
    format!(
        r#"
        (function() {{
            return Array.from(document.querySelectorAll({}))
                .map(el => el.textContent || '');
        }})()
        "#,
        js_string(plans::RESOURCE_CONTAINER_CSS)
    )
}

fn edit_click_script(index: usize) -> String {
    format!(
        r#"
        (function() {{
            const containers = document.querySelectorAll({});
            const container = containers[{}];
            if (!container) return {{ found: false }};
            const button = container.querySelector({}) || container.querySelector('button');
            if (!button) return {{ found: false }};
            button.click();
            return {{ found: true, applied: true }};
        }})()
        "#,
        js_string(plans::RESOURCE_CONTAINER_CSS),
        index,
        js_string(plans::EDIT_BUTTON_CSS)
    )
}

fn starter_slot_script(slot: usize, value: &str) -> String {
    format!(
        r#"
        (function() {{
            const sections = Array.from(document.querySelectorAll({}));
            const section = sections.find(el =>
                (el.textContent || '').toLowerCase().includes({}));
            if (!section) return {{ found: false }};
            const slots = section.querySelectorAll('input[type="text"]');
            const input = slots[{}];
            if (!input) return {{ found: false }};
            input.focus();
            input.value = '';
            input.value = {};
            for (const type of ['input', 'change']) {{
                input.dispatchEvent(new Event(type, {{ bubbles: true, cancelable: true }}));
            }}
            return {{ found: true, applied: true }};
        }})()
        "#,
        js_string(plans::SECTION_CSS),
        js_string(plans::STARTERS_SECTION_TEXT),
        slot,
        js_string(value)
    )
}

fn select_integration_script() -> String {
    format!(
        r#"
        (function() {{
            const sections = Array.from(document.querySelectorAll({}));
            const section = sections.find(el =>
                (el.textContent || '').toLowerCase().includes({}));
            if (!section) return {{ found: false }};
            const buttons = Array.from(section.querySelectorAll('button'));
            const existing = buttons.find(b =>
                !(b.textContent || '').toLowerCase().includes({create}));
            if (existing) {{
                existing.click();
                return {{ found: true, applied: true, existing: true }};
            }}
            const create = buttons.find(b =>
                (b.textContent || '').toLowerCase().includes({create}));
            if (create) {{
                create.click();
                return {{ found: true, applied: true, existing: false }};
            }}
            return {{ found: true, applied: false }};
        }})()
        "#,
        js_string(plans::SECTION_CSS),
        js_string(plans::ACTIONS_SECTION_TEXT),
        create = js_string(plans::CREATE_ACTION_TEXT)
    )
}
