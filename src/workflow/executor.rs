use crate::browser::driver::Driver;
use crate::browser::session::Session;
use crate::config::TimeoutConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One concrete way to find an element. Ordered lists of locators implement
/// fallback: most specific and most stable first, generic text matches last.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// First element matching a CSS selector.
    Css(String),
    /// First element matching `css` whose text contains `text`,
    /// case-insensitively.
    Text { css: String, text: String },
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn text(css: &str, text: &str) -> Self {
        Locator::Text {
            css: css.to_string(),
            text: text.to_string(),
        }
    }

    /// JavaScript expression evaluating to the element or null.
    fn resolve_expr(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::Text { css, text } => format!(
                "Array.from(document.querySelectorAll({})).find(el => \
                 (el.textContent || '').toLowerCase().includes({})) || null",
                js_string(css),
                js_string(&text.to_lowercase())
            ),
        }
    }
}

/// One logical UI action plus its ordered fallback locators.
#[derive(Debug, Clone)]
pub struct ActionStrategy {
    pub name: &'static str,
    pub locators: Vec<Locator>,
}

impl ActionStrategy {
    pub fn new(name: &'static str, locators: Vec<Locator>) -> Self {
        Self { name, locators }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Click,
    /// Replace any existing content with the value. Never appends.
    Fill(String),
}

/// Result of one logical action. Exhausting every locator is a reported
/// condition, not an error: downstream fields are independent.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Applied { strategy: usize },
    Skipped,
}

impl ActionOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, ActionOutcome::Applied { .. })
    }
}

/// Shared interpreter for fallback strategy lists. Resolution and application
/// happen inside a single page evaluation so no element handle outlives the
/// script that found it.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    primary_timeout: Duration,
    fallback_timeout: Duration,
    poll_interval: Duration,
}

impl ActionExecutor {
    pub fn new(primary_timeout: Duration, fallback_timeout: Duration) -> Self {
        Self {
            primary_timeout,
            fallback_timeout,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn from_config(timeouts: &TimeoutConfig) -> Self {
        Self::new(
            Duration::from_millis(timeouts.element_ms),
            Duration::from_millis(timeouts.element_fallback_ms),
        )
    }

    /// Try each locator in declaration order; the first one that resolves
    /// performs the action and wins. The primary locator gets the longer
    /// wait, fallbacks the shorter one.
    pub async fn perform<D: Driver>(
        &self,
        session: &Session<D>,
        strategy: &ActionStrategy,
        action: &UiAction,
    ) -> ActionOutcome {
        for (index, locator) in strategy.locators.iter().enumerate() {
            let timeout = if index == 0 {
                self.primary_timeout
            } else {
                self.fallback_timeout
            };
            let script = action_script(locator, action);
            let deadline = Instant::now() + timeout;

            loop {
                match session.evaluate(&script).await {
                    Ok(result) => {
                        let found = result
                            .get("found")
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false);
                        let applied = result
                            .get("applied")
                            .and_then(|v| v.as_bool())
                            .unwrap_or(false);
                        if found && applied {
                            info!(
                                action = strategy.name,
                                strategy = index,
                                "action applied"
                            );
                            return ActionOutcome::Applied { strategy: index };
                        }
                        if found {
                            // Element exists but cannot take this action;
                            // move on to the next locator.
                            debug!(action = strategy.name, strategy = index, "locator resolved but action not applicable");
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(action = strategy.name, strategy = index, "evaluation failed: {}", e);
                        break;
                    }
                }
                if Instant::now() >= deadline {
                    break;
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        warn!(action = strategy.name, "no locator resolved, skipping");
        ActionOutcome::Skipped
    }

    /// Presence probe with a bounded wait; used for markers that are observed
    /// rather than acted on (login affordance, dialogs, section headings).
    pub async fn wait_for<D: Driver>(
        &self,
        session: &Session<D>,
        locator: &Locator,
        timeout: Duration,
    ) -> bool {
        let script = presence_script(locator);
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(result) = session.evaluate(&script).await {
                if result.as_bool() == Some(true) {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

pub(crate) fn js_string(value: &str) -> String {
    // serde_json produces a valid JS string literal including quotes.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn presence_script(locator: &Locator) -> String {
    format!(
        r#"
        (function() {{
            const el = {};
            return el !== null && el !== undefined;
        }})()
        "#,
        locator.resolve_expr()
    )
}

fn action_script(locator: &Locator, action: &UiAction) -> String {
    match action {
        UiAction::Click => format!(
            r#"
            (function() {{
                const el = {};
                if (!el) return {{ found: false }};
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return {{ found: true, applied: true }};
            }})()
            "#,
            locator.resolve_expr()
        ),
        UiAction::Fill(value) => format!(
            r#"
            (function() {{
                const el = {};
                if (!el) return {{ found: false }};
                el.scrollIntoView({{ block: 'center' }});
                el.focus();
                el.click();
                const value = {};
                const tag = el.tagName.toLowerCase();
                if (tag === 'input' || tag === 'textarea') {{
                    el.value = '';
                    el.value = value;
                }} else if (el.isContentEditable) {{
                    el.textContent = '';
                    el.textContent = value;
                }} else {{
                    return {{ found: true, applied: false }};
                }}
                for (const type of ['input', 'change']) {{
                    el.dispatchEvent(new Event(type, {{ bubbles: true, cancelable: true }}));
                }}
                return {{ found: true, applied: true }};
            }})()
            "#,
            locator.resolve_expr(),
            js_string(value)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open_fake_session, FakeDriver};
    use serde_json::json;

    fn fast_executor() -> ActionExecutor {
        ActionExecutor::new(Duration::from_millis(50), Duration::from_millis(30))
    }

    fn hit() -> serde_json::Value {
        json!({ "found": true, "applied": true })
    }

    #[tokio::test]
    async fn first_resolving_strategy_wins_and_later_ones_never_run() {
        let driver = FakeDriver::new();
        driver.respond("input#primary-field", hit());
        driver.respond("input#fallback-field", hit());
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;

        let strategy = ActionStrategy::new(
            "name field",
            vec![
                Locator::css("input#primary-field"),
                Locator::css("input#fallback-field"),
            ],
        );
        let outcome = fast_executor()
            .perform(&session, &strategy, &UiAction::Fill("Helper".into()))
            .await;

        assert_eq!(outcome, ActionOutcome::Applied { strategy: 0 });
        assert_eq!(handle.scripts_containing("input#primary-field"), 1);
        assert_eq!(handle.scripts_containing("input#fallback-field"), 0);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn falls_back_when_primary_never_resolves() {
        let driver = FakeDriver::new();
        driver.respond("input#fallback-field", hit());
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;

        let strategy = ActionStrategy::new(
            "name field",
            vec![
                Locator::css("input#primary-field"),
                Locator::css("input#fallback-field"),
            ],
        );
        let outcome = fast_executor()
            .perform(&session, &strategy, &UiAction::Click)
            .await;

        assert_eq!(outcome, ActionOutcome::Applied { strategy: 1 });
        assert!(handle.scripts_containing("input#primary-field") >= 1);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn exhaustion_is_skipped_not_an_error() {
        let (lifecycle, mut session) = open_fake_session(FakeDriver::new()).await;
        let strategy = ActionStrategy::new("cosmetic", vec![Locator::css("div#nope")]);
        let outcome = fast_executor()
            .perform(&session, &strategy, &UiAction::Click)
            .await;
        assert_eq!(outcome, ActionOutcome::Skipped);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn evaluate_failure_degrades_to_skipped() {
        let driver = FakeDriver::new();
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;
        handle.fail_evaluate(true);

        let strategy = ActionStrategy::new("field", vec![Locator::css("input#x")]);
        let outcome = fast_executor()
            .perform(&session, &strategy, &UiAction::Click)
            .await;
        assert_eq!(outcome, ActionOutcome::Skipped);
        handle.fail_evaluate(false);
        lifecycle.close(&mut session).await;
    }

    #[test]
    fn fill_script_clears_before_setting_and_never_appends() {
        let locator = Locator::css("input#name");
        let script = action_script(&locator, &UiAction::Fill("Helper".into()));

        let clear = script.find("el.value = ''").expect("clears value first");
        let set = script.find("el.value = value").expect("sets new value");
        assert!(clear < set);
        assert!(!script.contains("+="));
        assert!(script.contains(&js_string("Helper")));
    }

    #[test]
    fn text_locator_matches_case_insensitively() {
        let locator = Locator::text("button", "Only Me");
        let expr = locator.resolve_expr();
        assert!(expr.contains(&js_string("only me")));
        assert!(expr.contains("toLowerCase()"));
    }

    #[tokio::test]
    async fn wait_for_reports_presence() {
        let driver = FakeDriver::new();
        driver.respond("div#marker", json!(true));
        let (lifecycle, mut session) = open_fake_session(driver).await;

        let executor = fast_executor();
        assert!(
            executor
                .wait_for(&session, &Locator::css("div#marker"), Duration::from_millis(50))
                .await
        );
        assert!(
            !executor
                .wait_for(&session, &Locator::css("div#absent"), Duration::from_millis(50))
                .await
        );
        lifecycle.close(&mut session).await;
    }
}
