//! In-memory test double for the [`Driver`] seam.
//!
//! `FakeDriver` answers page evaluations from a scripted response table:
//! the first rule whose pattern is a substring of the submitted script wins.
//! Every submitted script is recorded so tests can assert how often a given
//! strategy actually reached the page.

use crate::browser::cookies::CookieRecord;
use crate::browser::driver::Driver;
use crate::browser::session::{Session, SessionLifecycle};
use crate::config::{RunnerConfig, TimeoutConfig};
use crate::errors::{AutomationError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeState {
    running: bool,
    fail_new_tab: bool,
    fail_evaluate: bool,
    rules: Vec<(String, Value)>,
    scripts: Vec<String>,
    visited: Vec<String>,
    startup_scripts: Vec<String>,
    jar: Vec<CookieRecord>,
    restored: Vec<CookieRecord>,
    tabs_closed: u32,
    close_count: u32,
}

/// Scriptable [`Driver`] implementation backed by shared in-memory state.
#[derive(Default)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

pub struct FakeTab;

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response: any evaluated script containing `pattern`
    /// returns `value`. Rules are matched in registration order.
    pub fn respond(&self, pattern: &str, value: Value) {
        self.lock().rules.push((pattern.to_string(), value));
    }

    /// Pre-populate the browser-side cookie jar.
    pub fn seed_cookie(&self, name: &str, value: &str) {
        self.lock().jar.push(CookieRecord {
            name: name.to_string(),
            value: value.to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: true,
            same_site: None,
        });
    }

    pub fn fail_new_tab(&self, fail: bool) {
        self.lock().fail_new_tab = fail;
    }

    /// Shared view onto the driver's state, usable after the driver has
    /// been moved into a session.
    pub fn handle(&self) -> FakeDriverHandle {
        FakeDriverHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone)]
pub struct FakeDriverHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriverHandle {
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn scripts_containing(&self, pattern: &str) -> usize {
        self.lock()
            .scripts
            .iter()
            .filter(|s| s.contains(pattern))
            .count()
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    /// Scripts registered through the pre-page-script install seam, as
    /// opposed to plain evaluations.
    pub fn startup_scripts(&self) -> Vec<String> {
        self.lock().startup_scripts.clone()
    }

    /// Cookies pushed into the browser by session restore.
    pub fn restored_cookies(&self) -> Vec<CookieRecord> {
        self.lock().restored.clone()
    }

    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }

    pub fn fail_evaluate(&self, fail: bool) {
        self.lock().fail_evaluate = fail;
    }

    /// Simulate the browser process dying out from under the session.
    pub fn stop_running(&self) {
        self.lock().running = false;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Driver for FakeDriver {
    type TabHandle = FakeTab;

    async fn launch(&mut self, _config: &RunnerConfig) -> Result<()> {
        self.lock().running = true;
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        if self.lock().fail_new_tab {
            return Err(AutomationError::TabCreationFailed(
                "scripted tab failure".to_string(),
            ));
        }
        Ok(FakeTab)
    }

    async fn navigate(&self, _tab: &Self::TabHandle, url: &str) -> Result<()> {
        self.lock().visited.push(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, _tab: &Self::TabHandle, script: &str) -> Result<Value> {
        let mut state = self.lock();
        if state.fail_evaluate {
            return Err(AutomationError::JavaScriptFailed(
                "scripted evaluation failure".to_string(),
            ));
        }
        state.scripts.push(script.to_string());
        for (pattern, value) in &state.rules {
            if script.contains(pattern.as_str()) {
                return Ok(value.clone());
            }
        }
        Ok(Value::Null)
    }

    async fn install_startup_script(&self, _tab: &Self::TabHandle, source: &str) -> Result<()> {
        self.lock().startup_scripts.push(source.to_string());
        Ok(())
    }

    async fn get_cookies(&self, _tab: &Self::TabHandle) -> Result<Vec<CookieRecord>> {
        Ok(self.lock().jar.clone())
    }

    async fn set_cookies(&self, _tab: &Self::TabHandle, cookies: &[CookieRecord]) -> Result<()> {
        let mut state = self.lock();
        state.restored.extend_from_slice(cookies);
        state.jar.extend_from_slice(cookies);
        Ok(())
    }

    async fn close_tab(&self, _tab: &Self::TabHandle) -> Result<()> {
        self.lock().tabs_closed += 1;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.running = false;
        state.close_count += 1;
        Ok(())
    }
}

/// Timeouts shrunk so polling loops resolve in milliseconds.
pub fn fast_runner_config() -> RunnerConfig {
    let mut config = RunnerConfig::default();
    config.cookies_file = std::env::temp_dir().join(format!(
        "assistant-forge-test-{}.json",
        uuid::Uuid::new_v4()
    ));
    config.timeouts = TimeoutConfig {
        navigation_ms: 100,
        element_ms: 40,
        element_fallback_ms: 20,
        dialog_ms: 100,
        login_ms: 100,
        health_ms: 200,
        settle_ms: 1,
        retry_delay_ms: 1,
        max_attempts: 3,
    };
    config
}

/// Open a session over a `FakeDriver` with fast timeouts and a throwaway
/// cookie file.
pub async fn open_fake_session(driver: FakeDriver) -> (SessionLifecycle, Session<FakeDriver>) {
    let lifecycle = SessionLifecycle::new(fast_runner_config());
    let session = lifecycle
        .open(driver)
        .await
        .expect("fake session should always open");
    (lifecycle, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rules_match_in_registration_order() {
        tokio_test::block_on(async {
            let driver = FakeDriver::new();
            driver.respond("narrow pattern", json!("first"));
            driver.respond("pattern", json!("second"));

            let tab = driver.new_tab().await.unwrap();
            let hit = driver
                .evaluate(&tab, "script with narrow pattern inside")
                .await
                .unwrap();
            assert_eq!(hit, json!("first"));

            let fallback = driver.evaluate(&tab, "just a pattern").await.unwrap();
            assert_eq!(fallback, json!("second"));

            let miss = driver.evaluate(&tab, "nothing registered").await.unwrap();
            assert_eq!(miss, Value::Null);
        });
    }

    #[test]
    fn script_log_counts_every_submission() {
        tokio_test::block_on(async {
            let driver = FakeDriver::new();
            let handle = driver.handle();
            let tab = driver.new_tab().await.unwrap();

            driver.evaluate(&tab, "document.title").await.unwrap();
            driver.evaluate(&tab, "document.title").await.unwrap();
            driver.evaluate(&tab, "true").await.unwrap();

            assert_eq!(handle.scripts_containing("document.title"), 2);
            assert_eq!(handle.scripts().len(), 3);
        });
    }

    #[test]
    fn failed_evaluations_are_not_logged() {
        tokio_test::block_on(async {
            let driver = FakeDriver::new();
            let handle = driver.handle();
            handle.fail_evaluate(true);
            let tab = driver.new_tab().await.unwrap();

            assert!(driver.evaluate(&tab, "document.title").await.is_err());
            assert_eq!(handle.scripts().len(), 0);
        });
    }
}
