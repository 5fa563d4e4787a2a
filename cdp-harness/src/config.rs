// Harness configuration
//
// Defaults suit a local test-harness proxy; env vars override them

use crate::error::{HarnessError, HarnessResult};
use crate::inspector::DEFAULT_READY_METHOD;
use cdp_client::ConnectionConfig;
use std::time::Duration;

pub const ENDPOINT_ENV: &str = "CDP_HARNESS_ENDPOINT";
pub const TIMEOUT_ENV: &str = "CDP_HARNESS_TIMEOUT_MS";

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:9300/launch-chrome-and-connect";
/// Tests have one minute to complete by default
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// WebSocket endpoint of the test-harness proxy
    pub endpoint: String,
    /// Deadline for one whole session, setup included
    pub timeout: Duration,
    /// Notification that signals the runtime is ready to be debugged
    pub ready_event: String,
    pub connection: ConnectionConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            ready_event: DEFAULT_READY_METHOD.to_string(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `CDP_HARNESS_ENDPOINT` and `CDP_HARNESS_TIMEOUT_MS`
    pub fn from_env() -> HarnessResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
                return Err(HarnessError::Config(format!(
                    "{} must be a ws:// or wss:// url, got {:?}",
                    ENDPOINT_ENV, endpoint
                )));
            }
            config.endpoint = endpoint;
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|e| {
                HarnessError::Config(format!("{}={:?} is not a number: {}", TIMEOUT_ENV, raw, e))
            })?;
            if millis == 0 {
                return Err(HarnessError::Config(format!("{} must be positive", TIMEOUT_ENV)));
            }
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ready_event(mut self, method: impl Into<String>) -> Self {
        self.ready_event = method.into();
        self
    }
}
