//! Session configuration consumed by the vendor adapters

use crate::vendor::Vendor;
use serde::{Deserialize, Serialize};

/// Where the camera should push alarm callbacks (Instar only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushServerConfig {
    /// Address of this host as seen by the camera
    pub host: String,
    /// Port of the push server; 0 disables registration
    pub port: u16,
}

/// Per-camera configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Firmware dialect
    pub vendor: Vendor,
    /// Username embedded in requests by vendors that need it
    #[serde(default)]
    pub username: String,
    /// Password embedded in requests by vendors that need it
    #[serde(default)]
    pub password: String,
    /// Sent verbatim instead of the built request when enabling audio alarms
    #[serde(default)]
    pub audio_url_override: Option<String>,
    /// Sent verbatim instead of the built requests when enabling motion alarms
    #[serde(default)]
    pub motion_url_override: Option<String>,
    #[serde(default)]
    pub push_server: Option<PushServerConfig>,
}

impl SessionConfig {
    /// Create a config with credentials and no overrides
    pub fn new(vendor: Vendor, username: &str, password: &str) -> Self {
        Self {
            vendor,
            username: username.to_string(),
            password: password.to_string(),
            audio_url_override: None,
            motion_url_override: None,
            push_server: None,
        }
    }

    pub fn audio_override(&self) -> Option<&str> {
        non_blank(self.audio_url_override.as_deref())
    }

    pub fn motion_override(&self) -> Option<&str> {
        non_blank(self.motion_url_override.as_deref())
    }

    /// Push server, if one is configured with a usable port
    pub fn push_target(&self) -> Option<&PushServerConfig> {
        self.push_server.as_ref().filter(|p| p.port > 0)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = SessionConfig::new(Vendor::Foscam, "admin", "pw");
        config.audio_url_override = Some("  ".to_string());
        config.motion_url_override = Some("/custom".to_string());
        assert_eq!(config.audio_override(), None);
        assert_eq!(config.motion_override(), Some("/custom"));
    }

    #[test]
    fn test_push_target_requires_port() {
        let mut config = SessionConfig::new(Vendor::Instar, "", "");
        config.push_server = Some(PushServerConfig {
            host: "192.168.1.5".to_string(),
            port: 0,
        });
        assert!(config.push_target().is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"vendor":"instar"}"#).unwrap();
        assert_eq!(config.vendor, Vendor::Instar);
        assert!(config.username.is_empty());
        assert!(config.push_server.is_none());
    }
}
