use crate::browser::cookies::CookieRecord;
use crate::config::RunnerConfig;
use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Driver: Send + Sync {
    type TabHandle: Send + Sync;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &RunnerConfig) -> Result<()>;

    /// Create a new tab/page
    async fn new_tab(&self) -> Result<Self::TabHandle>;

    /// Navigate to a URL and wait for the navigation to commit
    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()>;

    /// Execute JavaScript in the page
    async fn evaluate(&self, tab: &Self::TabHandle, script: &str) -> Result<Value>;

    /// Install a script that runs before any page script on every navigation
    async fn install_startup_script(&self, tab: &Self::TabHandle, source: &str) -> Result<()>;

    /// Read all cookies visible to the tab
    async fn get_cookies(&self, tab: &Self::TabHandle) -> Result<Vec<CookieRecord>>;

    /// Restore previously persisted cookies into the browsing context
    async fn set_cookies(&self, tab: &Self::TabHandle, cookies: &[CookieRecord]) -> Result<()>;

    /// Close one tab without tearing down the browser
    async fn close_tab(&self, tab: &Self::TabHandle) -> Result<()>;

    /// Check if the browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser
    async fn close(&mut self) -> Result<()>;
}
