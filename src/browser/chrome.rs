use crate::browser::cookies::CookieRecord;
use crate::browser::driver::Driver;
use crate::config::RunnerConfig;
use crate::errors::{AutomationError, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;

/// Chrome implementation of [`Driver`] via headless_chrome.
///
/// Cookie transfer goes through injected JavaScript rather than CDP, so only
/// cookies visible to the page travel through the store. That is acceptable:
/// persisted credentials are best-effort and the login flow tolerates a cold
/// start.
pub struct ChromeDriver {
    browser: Option<Browser>,
}

impl ChromeDriver {
    pub fn new() -> Self {
        Self { browser: None }
    }
}

impl Default for ChromeDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    type TabHandle = Arc<Tab>;

    async fn launch(&mut self, config: &RunnerConfig) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );
        let user_agent_arg = format!("--user-agent={}", config.browser.user_agent);
        let lang_arg = format!("--lang={}", config.browser.locale);

        let mut args = vec![
            OsStr::new(&window_size_arg),
            OsStr::new(&user_agent_arg),
            OsStr::new(&lang_arg),
        ];
        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(AutomationError::NoActiveSession)?;

        let tab = browser
            .new_tab()
            .map_err(|e| AutomationError::TabCreationFailed(e.to_string()))?;

        Ok(tab)
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()> {
        url::Url::parse(url)
            .map_err(|e| AutomationError::NavigationFailed(format!("{}: {}", url, e)))?;

        tab.navigate_to(url)
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;

        tab.wait_until_navigated()
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn evaluate(&self, tab: &Self::TabHandle, script: &str) -> Result<Value> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn install_startup_script(&self, tab: &Self::TabHandle, source: &str) -> Result<()> {
        // Registers with the page domain, so the script runs ahead of the
        // document's own scripts on every subsequent navigation.
        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: source.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;

        // The tab's current document predates the registration.
        self.evaluate(tab, source).await?;
        Ok(())
    }

    async fn get_cookies(&self, tab: &Self::TabHandle) -> Result<Vec<CookieRecord>> {
        let script = r#"
            (function() {
                const cookies = [];
                document.cookie.split(';').forEach(cookie => {
                    const idx = cookie.indexOf('=');
                    if (idx < 0) return;
                    const name = cookie.slice(0, idx).trim();
                    const value = cookie.slice(idx + 1).trim();
                    if (name) {
                        cookies.push({
                            name: name,
                            value: value,
                            domain: window.location.hostname,
                            path: '/',
                            expires: null,
                            http_only: false,
                            secure: window.location.protocol === 'https:',
                            same_site: null
                        });
                    }
                });
                return cookies;
            })()
        "#;

        let result = self.evaluate(tab, script).await?;
        let cookies: Vec<CookieRecord> = serde_json::from_value(result)?;
        Ok(cookies)
    }

    async fn set_cookies(&self, tab: &Self::TabHandle, cookies: &[CookieRecord]) -> Result<()> {
        for cookie in cookies {
            let mut parts = vec![format!(
                "{}={}; path={}",
                cookie.name, cookie.value, cookie.path
            )];
            if let Some(expires) = cookie.expires {
                if let Some(when) = chrono::DateTime::from_timestamp(expires as i64, 0) {
                    parts.push(format!(
                        "expires={}",
                        when.format("%a, %d %b %Y %H:%M:%S GMT")
                    ));
                }
            }
            if cookie.secure {
                parts.push("secure".to_string());
            }
            if let Some(same_site) = &cookie.same_site {
                parts.push(format!("samesite={}", same_site));
            }
            let script = format!(
                r#"
                (function() {{
                    document.cookie = {};
                    return true;
                }})()
                "#,
                serde_json::to_string(&parts.join("; "))?
            );
            self.evaluate(tab, &script).await?;
        }
        Ok(())
    }

    async fn close_tab(&self, tab: &Self::TabHandle) -> Result<()> {
        tab.close(true)
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the Browser handle terminates the Chrome process.
        self.browser = None;
        Ok(())
    }
}
