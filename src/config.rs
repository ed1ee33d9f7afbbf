use crate::errors::{AutomationError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum number of conversation starters the editor exposes.
pub const MAX_STARTERS: usize = 4;

/// Desired end state of the remote assistant, loaded once per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfiguration {
    pub name: String,
    pub description: String,
    pub instructions: String,
    #[serde(default)]
    pub conversation_starters: Vec<String>,
    #[serde(default)]
    pub openapi_spec_file: Option<PathBuf>,
}

impl TargetConfiguration {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::ConfigurationInvalid(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: TargetConfiguration = serde_json::from_str(&raw).map_err(|e| {
            AutomationError::ConfigurationInvalid(format!(
                "cannot parse {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AutomationError::ConfigurationInvalid(
                "'name' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// First four starters only; the editor has no slots for more.
    pub fn starters(&self) -> &[String] {
        let end = self.conversation_starters.len().min(MAX_STARTERS);
        &self.conversation_starters[..end]
    }

    /// Load the integration schema document verbatim, without interpreting it.
    pub fn load_openapi_schema(&self) -> Result<Option<serde_json::Value>> {
        let Some(path) = &self.openapi_spec_file else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AutomationError::ConfigurationInvalid(format!(
                "cannot read schema {}: {}",
                path.display(),
                e
            ))
        })?;
        let schema = serde_json::from_str(&raw).map_err(|e| {
            AutomationError::ConfigurationInvalid(format!(
                "cannot parse schema {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Some(schema))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub browser: BrowserConfig,
    pub timeouts: TimeoutConfig,
    pub app: AppConfig,
    pub cookies_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// The login step needs a human, so the browser stays visible.
    pub headless: bool,
    pub user_agent: String,
    pub locale: String,
    pub viewport: Viewport,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub navigation_ms: u64,
    pub element_ms: u64,
    pub element_fallback_ms: u64,
    pub dialog_ms: u64,
    pub login_ms: u64,
    pub health_ms: u64,
    pub settle_ms: u64,
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
}

/// Navigable addresses of the target application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub root_url: String,
    pub editor_url: String,
    pub listing_url: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            timeouts: TimeoutConfig::default(),
            app: AppConfig::default(),
            cookies_file: PathBuf::from("assistant_cookies.json"),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            locale: "en-US".to_string(),
            viewport: Viewport::default(),
            args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            element_ms: 5_000,
            element_fallback_ms: 3_000,
            dialog_ms: 10_000,
            login_ms: 180_000,
            health_ms: 5_000,
            settle_ms: 2_000,
            retry_delay_ms: 3_000,
            max_attempts: 3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_url: "https://chatgpt.com/".to_string(),
            editor_url: "https://chatgpt.com/gpts/editor".to_string(),
            listing_url: "https://chatgpt.com/gpts/mine".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"{
                "name": "Helper",
                "description": "d",
                "instructions": "i",
                "conversation_starters": ["a", "b", "c", "d", "e"]
            }"#,
        );
        let config = TargetConfiguration::load(file.path()).unwrap();
        assert_eq!(config.name, "Helper");
        assert_eq!(config.conversation_starters.len(), 5);
        assert_eq!(config.starters().len(), 4);
        assert!(config.openapi_spec_file.is_none());
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let file = write_config(r#"{"name": "Helper", "description": "d"}"#);
        let err = TargetConfiguration::load(file.path()).unwrap_err();
        assert!(matches!(err, AutomationError::ConfigurationInvalid(_)));
    }

    #[test]
    fn empty_name_is_invalid() {
        let file = write_config(r#"{"name": "  ", "description": "d", "instructions": "i"}"#);
        let err = TargetConfiguration::load(file.path()).unwrap_err();
        assert!(matches!(err, AutomationError::ConfigurationInvalid(_)));
    }

    #[test]
    fn missing_file_is_invalid_not_io() {
        let err = TargetConfiguration::load(Path::new("/nonexistent/cfg.json")).unwrap_err();
        assert!(matches!(err, AutomationError::ConfigurationInvalid(_)));
    }

    #[test]
    fn fewer_than_four_starters_pass_through() {
        let file = write_config(
            r#"{"name": "Helper", "description": "d", "instructions": "i",
                "conversation_starters": ["only one"]}"#,
        );
        let config = TargetConfiguration::load(file.path()).unwrap();
        assert_eq!(config.starters(), ["only one".to_string()]);
    }
}
