//! Contextual signals for one authentication attempt.
//!
//! The engine consumes network origin and client labels through the
//! [`SignalSource`] collaborator. Lookups are best-effort: implementations
//! swallow failures and fall back to the documented "Unknown"/zero values,
//! never an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DevicePosture;

/// Network-derived origin of the attempt (geolocation + ISP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOrigin {
    pub ip: String,
    pub country: String,
    pub city: String,
    pub region: String,
    pub isp: String,
    pub timezone: String,
    pub lat: f64,
    pub lon: f64,
}

impl NetworkOrigin {
    /// Fallback origin when the lookup service is unreachable.
    pub fn unknown() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            region: String::new(),
            isp: "Unknown".to_string(),
            timezone: String::new(),
            lat: 0.0,
            lon: 0.0,
        }
    }

    /// "City, Country" label used in audit events.
    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

impl Default for NetworkOrigin {
    fn default() -> Self {
        Self::unknown()
    }
}

/// User-agent-derived client labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub user_agent: String,
    pub os: String,
    pub browser: String,
}

impl ClientInfo {
    pub fn unknown() -> Self {
        Self {
            user_agent: String::new(),
            os: "Unknown".to_string(),
            browser: "Unknown".to_string(),
        }
    }

    /// Derive OS and browser labels from a raw user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            os: detect_os(user_agent).to_string(),
            browser: detect_browser(user_agent).to_string(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

pub fn detect_os(user_agent: &str) -> &'static str {
    if user_agent.contains("Windows") {
        "Windows"
    } else if user_agent.contains("Mac") {
        "macOS"
    } else if user_agent.contains("Android") {
        "Android"
    } else if user_agent.contains("iPhone") || user_agent.contains("iOS") {
        "iOS"
    } else if user_agent.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    }
}

pub fn detect_browser(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg") {
        "Edge"
    } else if user_agent.contains("Chrome") {
        "Chrome"
    } else if user_agent.contains("Firefox") {
        "Firefox"
    } else if user_agent.contains("Safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

/// Collaborator that resolves the current attempt's origin and client.
///
/// Both lookups are best-effort and infallible at this boundary: an
/// implementation that cannot reach its upstream returns
/// [`NetworkOrigin::unknown`] / [`ClientInfo::unknown`].
#[async_trait]
pub trait SignalSource: Send + Sync + 'static {
    async fn current_origin(&self) -> NetworkOrigin;
    async fn current_client(&self) -> ClientInfo;
}

/// A [`SignalSource`] that always returns fixed values. Useful for embedding
/// the engine behind a request handler that already resolved the signals, and
/// for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSignalSource {
    pub origin: NetworkOrigin,
    pub client: ClientInfo,
}

impl StaticSignalSource {
    pub fn new(origin: NetworkOrigin, client: ClientInfo) -> Self {
        Self { origin, client }
    }
}

#[async_trait]
impl SignalSource for StaticSignalSource {
    async fn current_origin(&self) -> NetworkOrigin {
        self.origin.clone()
    }

    async fn current_client(&self) -> ClientInfo {
        self.client.clone()
    }
}

/// Everything the risk scorer looks at for one attempt, assembled by the
/// state machine right before policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub origin: NetworkOrigin,
    pub client: ClientInfo,
    pub login_time: DateTime<Utc>,
    pub failed_attempts: u32,
    pub device_approved: bool,
    pub posture: DevicePosture,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_os() {
        assert_eq!(detect_os("Mozilla/5.0 (Windows NT 10.0; Win64)"), "Windows");
        assert_eq!(detect_os("Mozilla/5.0 (Macintosh; Intel Mac OS X)"), "macOS");
        assert_eq!(detect_os("Mozilla/5.0 (X11; Linux x86_64)"), "Linux");
        assert_eq!(detect_os("Mozilla/5.0 (Linux; Android 14)"), "Android");
        assert_eq!(detect_os("Mozilla/5.0 (iPhone; CPU iPhone OS)"), "iOS");
        assert_eq!(detect_os("curl/8.0"), "Unknown");
    }

    #[test]
    fn test_detect_browser() {
        assert_eq!(detect_browser("Mozilla/5.0 Chrome/120.0 Safari/537.36"), "Chrome");
        assert_eq!(
            detect_browser("Mozilla/5.0 Chrome/120.0 Safari/537.36 Edg/120.0"),
            "Edge"
        );
        assert_eq!(detect_browser("Mozilla/5.0 Gecko/20100101 Firefox/121.0"), "Firefox");
        assert_eq!(detect_browser("Mozilla/5.0 Version/17.0 Safari/605.1.15"), "Safari");
        assert_eq!(detect_browser("curl/8.0"), "Unknown");
    }

    #[test]
    fn test_unknown_fallbacks() {
        let origin = NetworkOrigin::unknown();
        assert_eq!(origin.ip, "0.0.0.0");
        assert_eq!(origin.country, "Unknown");
        assert_eq!(origin.location(), "Unknown, Unknown");

        let client = ClientInfo::unknown();
        assert_eq!(client.os, "Unknown");
    }
}
