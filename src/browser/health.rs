use crate::browser::driver::Driver;
use crate::browser::session::Session;
use crate::errors::{AutomationError, Result};
use std::time::Duration;
use tracing::{debug, error};

/// Trivial round trip; only reachability matters, not the value.
const PROBE_SCRIPT: &str = "true";

/// Single source of truth for whether the driven browser is still usable.
/// Consulted after every navigation and after each batch of field edits so a
/// crash surfaces within one logical step instead of as a confusing selector
/// failure later.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    /// Never errors and never panics; any failure mode reads as "not alive".
    pub async fn is_alive<D: Driver>(&self, session: &Session<D>) -> bool {
        if !session.is_initialized() {
            return false;
        }
        if !session.driver_running() {
            return false;
        }
        match tokio::time::timeout(self.probe_timeout, session.evaluate(PROBE_SCRIPT)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Health probe failed: {}", e);
                false
            }
            Err(_) => {
                debug!("Health probe timed out");
                false
            }
        }
    }

    pub async fn ensure_alive<D: Driver>(&self, session: &Session<D>) -> Result<()> {
        if self.is_alive(session).await {
            Ok(())
        } else {
            error!("Browser has crashed or become unresponsive");
            Err(AutomationError::SessionCrashed)
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open_fake_session, FakeDriver};

    #[tokio::test]
    async fn alive_when_probe_succeeds() {
        let (lifecycle, mut session) = open_fake_session(FakeDriver::new()).await;
        assert!(HealthMonitor::default().is_alive(&session).await);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn dead_when_session_torn_down() {
        let (lifecycle, mut session) = open_fake_session(FakeDriver::new()).await;
        lifecycle.close(&mut session).await;
        assert!(!HealthMonitor::default().is_alive(&session).await);
    }

    #[tokio::test]
    async fn dead_when_driver_stopped() {
        let driver = FakeDriver::new();
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;
        handle.stop_running();
        assert!(!HealthMonitor::default().is_alive(&session).await);
        lifecycle.close(&mut session).await;
    }

    #[tokio::test]
    async fn dead_when_probe_throws() {
        let driver = FakeDriver::new();
        let handle = driver.handle();
        let (lifecycle, mut session) = open_fake_session(driver).await;
        handle.fail_evaluate(true);
        assert!(!HealthMonitor::default().is_alive(&session).await);
        let err = HealthMonitor::default().ensure_alive(&session).await.unwrap_err();
        assert!(matches!(err, AutomationError::SessionCrashed));
        handle.fail_evaluate(false);
        lifecycle.close(&mut session).await;
    }
}
