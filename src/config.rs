//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::endpoint::DISCOVERY_URL;

/// Tunables for discovery, pairing, and the HTTP transport.
///
/// Durations are (de)serialized as milliseconds; missing fields fall back to
/// the defaults.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hue_bridge_rs::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(r#"{"pairing_timeout": 30000}"#).unwrap();
/// assert_eq!(config.pairing_timeout, Duration::from_secs(30));
/// assert_eq!(config.pairing_backoff, Duration::from_secs(2));
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Whole-request timeout applied by the HTTP transport.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_timeout: Duration,
    /// How long to wait for the link button during pairing.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pairing_timeout: Duration,
    /// Fixed pause between pairing attempts.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub pairing_backoff: Duration,
    /// `devicetype` sent when registering, `<application>#<device>`.
    pub device_type: String,
    pub discovery_url: String,
}

impl BridgeConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_PAIRING_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_PAIRING_BACKOFF: Duration = Duration::from_secs(2);
    pub const DEFAULT_DEVICE_TYPE: &'static str = "hue-bridge-rs#rust";

    /// Set how long pairing waits for the link button.
    pub fn with_pairing_timeout(mut self, timeout: Duration) -> Self {
        self.pairing_timeout = timeout;
        self
    }

    /// Set the pause between registration attempts.
    pub fn with_pairing_backoff(mut self, backoff: Duration) -> Self {
        self.pairing_backoff = backoff;
        self
    }

    /// Set the `devicetype` sent when registering.
    pub fn with_device_type(mut self, device_type: &str) -> Self {
        self.device_type = device_type.to_string();
        self
    }

    /// Point discovery at another service.
    pub fn with_discovery_url(mut self, url: &str) -> Self {
        self.discovery_url = url.to_string();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            pairing_timeout: Self::DEFAULT_PAIRING_TIMEOUT,
            pairing_backoff: Self::DEFAULT_PAIRING_BACKOFF,
            device_type: Self::DEFAULT_DEVICE_TYPE.to_string(),
            discovery_url: DISCOVERY_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.pairing_timeout, Duration::from_secs(60));
        assert_eq!(config.pairing_backoff, Duration::from_secs(2));
        assert_eq!(config.discovery_url, DISCOVERY_URL);
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let config = BridgeConfig::default().with_pairing_backoff(Duration::from_millis(250));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["pairing_backoff"], 250);
        assert_eq!(value["request_timeout"], 10_000);

        let back: BridgeConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }
}
