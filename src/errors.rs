use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Browser session crashed or became unresponsive")]
    SessionCrashed,

    #[error("Interactive login did not complete within the time limit")]
    LoginTimeout,

    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Tab creation failed: {0}")]
    TabCreationFailed(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

// Convert anyhow::Error to AutomationError
impl From<anyhow::Error> for AutomationError {
    fn from(err: anyhow::Error) -> Self {
        AutomationError::JavaScriptFailed(err.to_string())
    }
}
