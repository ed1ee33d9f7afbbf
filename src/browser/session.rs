use crate::browser::cookies::CookieStore;
use crate::browser::driver::Driver;
use crate::config::RunnerConfig;
use crate::errors::{AutomationError, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs before any page script so the site cannot read the automation flag.
const STEALTH_STARTUP_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
    });
"#;

const TAB_SETTLE: Duration = Duration::from_millis(500);
const BROWSER_SETTLE: Duration = Duration::from_millis(1000);

/// One live browser plus one tab. Either fully initialized or fully torn
/// down; no in-between state is observable outside [`SessionLifecycle`].
pub struct Session<D: Driver> {
    id: String,
    driver: Option<D>,
    tab: Option<D::TabHandle>,
}

impl<D: Driver> Session<D> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.is_some() && self.tab.is_some()
    }

    pub fn driver_running(&self) -> bool {
        self.driver.as_ref().map(D::is_running).unwrap_or(false)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        let (driver, tab) = self.parts()?;
        debug!(session = %self.id, url, "navigating");
        driver.navigate(tab, url).await
    }

    pub async fn evaluate(&self, script: &str) -> Result<Value> {
        let (driver, tab) = self.parts()?;
        driver.evaluate(tab, script).await
    }

    fn parts(&self) -> Result<(&D, &D::TabHandle)> {
        match (self.driver.as_ref(), self.tab.as_ref()) {
            (Some(driver), Some(tab)) => Ok((driver, tab)),
            _ => Err(AutomationError::NoActiveSession),
        }
    }
}

/// Owns creation, credential restore, and guaranteed teardown of one session.
pub struct SessionLifecycle {
    config: RunnerConfig,
    cookie_store: CookieStore,
}

impl SessionLifecycle {
    pub fn new(config: RunnerConfig) -> Self {
        let cookie_store = CookieStore::new(config.cookies_file.clone());
        Self {
            config,
            cookie_store,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn open<D: Driver>(&self, mut driver: D) -> Result<Session<D>> {
        driver.launch(&self.config).await?;

        let tab = match driver.new_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                let _ = driver.close().await;
                return Err(e);
            }
        };

        if let Err(e) = driver.install_startup_script(&tab, STEALTH_STARTUP_SCRIPT).await {
            debug!("Startup script installation failed: {}", e);
        }

        // Restore persisted credentials. Missing or stale cookies are a
        // no-op, never an error; the login flow copes with a cold start.
        if let Some(cookies) = self.cookie_store.load() {
            let restore = async {
                driver.navigate(&tab, &self.config.app.root_url).await?;
                driver.set_cookies(&tab, &cookies).await
            };
            if let Err(e) = restore.await {
                debug!("Cookie restore failed, continuing without: {}", e);
            }
        }

        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            driver: Some(driver),
            tab: Some(tab),
        };
        info!(session = %session.id, "browser session opened");
        Ok(session)
    }

    /// Teardown runs every step regardless of earlier failures and clears all
    /// handles on every path. Callers may pass a session in any state.
    pub async fn close<D: Driver>(&self, session: &mut Session<D>) {
        if let (Some(driver), Some(tab)) = (session.driver.as_ref(), session.tab.as_ref()) {
            match driver.get_cookies(tab).await {
                Ok(cookies) => {
                    if let Err(e) = self.cookie_store.save(&cookies) {
                        warn!("Failed to persist cookies: {}", e);
                    }
                }
                Err(e) => debug!("Skipping cookie persist: {}", e),
            }
        }

        if let Some(tab) = session.tab.take() {
            if let Some(driver) = session.driver.as_ref() {
                if let Err(e) = driver.close_tab(&tab).await {
                    debug!("Tab close failed: {}", e);
                }
            }
            // Let the renderer shut down before touching the browser process.
            tokio::time::sleep(TAB_SETTLE).await;
        }

        if let Some(mut driver) = session.driver.take() {
            if let Err(e) = driver.close().await {
                debug!("Browser close failed: {}", e);
            }
            // OS-level process and pipe cleanup needs a moment.
            tokio::time::sleep(BROWSER_SETTLE).await;
        }

        info!(session = %session.id, "browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;

    fn lifecycle_with_store(dir: &std::path::Path) -> SessionLifecycle {
        let mut config = RunnerConfig::default();
        config.cookies_file = dir.join("cookies.json");
        SessionLifecycle::new(config)
    }

    #[tokio::test]
    async fn open_produces_fully_initialized_session() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());
        let session = lifecycle.open(FakeDriver::new()).await.unwrap();
        assert!(session.is_initialized());
        assert!(session.driver_running());
    }

    #[tokio::test]
    async fn stealth_script_goes_through_the_startup_install_seam() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());
        let driver = FakeDriver::new();
        let handle = driver.handle();
        let mut session = lifecycle.open(driver).await.unwrap();

        let installed = handle.startup_scripts();
        assert_eq!(installed.len(), 1);
        assert!(installed[0].contains("webdriver"));
        // A plain evaluation would run after the page's own scripts.
        assert_eq!(handle.scripts_containing("webdriver"), 0);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn close_clears_all_handles() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());
        let mut session = lifecycle.open(FakeDriver::new()).await.unwrap();
        lifecycle.close(&mut session).await;
        assert!(!session.is_initialized());
        assert!(session.evaluate("true").await.is_err());
    }

    #[tokio::test]
    async fn close_is_safe_on_already_closed_session() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());
        let mut session = lifecycle.open(FakeDriver::new()).await.unwrap();
        lifecycle.close(&mut session).await;
        lifecycle.close(&mut session).await;
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn close_persists_cookies_for_next_open() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());

        let driver = FakeDriver::new();
        driver.seed_cookie("auth", "token-1");
        let mut session = lifecycle.open(driver).await.unwrap();
        lifecycle.close(&mut session).await;

        // A fresh driver receives the persisted cookies during open.
        let driver = FakeDriver::new();
        let handle = driver.handle();
        let mut session = lifecycle.open(driver).await.unwrap();
        assert!(handle.restored_cookies().iter().any(|c| c.name == "auth"));
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn failed_tab_creation_tears_the_driver_down() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = lifecycle_with_store(dir.path());
        let driver = FakeDriver::new();
        driver.fail_new_tab(true);
        let handle = driver.handle();
        assert!(lifecycle.open(driver).await.is_err());
        assert_eq!(handle.close_count(), 1);
    }
}
