// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types.
//!
//! The configuration is a TOML file with an `[mqtt]` and a `[hue]` table.
//! Unknown keys are rejected.
//!
//! ```toml
//! [mqtt]
//! host = "192.168.1.50"
//! port = 1883
//! topic_prefix = "hue2mqtt"
//!
//! [hue]
//! ip = "192.168.1.2"
//! username = "abcdefg"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Locations searched for a configuration file, in order.
const CONFIG_SEARCH_PATHS: &[&str] = &["hue2mqtt.toml", "/etc/hue2mqtt.toml"];

/// MQTT broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttBrokerInfo {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Whether to send `username` and `password` when connecting.
    #[serde(default)]
    pub enable_auth: bool,
    /// Username used when `enable_auth` is set.
    #[serde(default)]
    pub username: String,
    /// Password used when `enable_auth` is set.
    #[serde(default)]
    pub password: String,
    /// Whether to connect over TLS.
    #[serde(default)]
    pub enable_tls: bool,
    /// Prefix prepended to every application topic.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    /// Use MQTT 3.1.1 instead of MQTT 5.
    #[serde(default)]
    pub force_protocol_version_3_1: bool,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// How long to wait for the broker to acknowledge a connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_topic_prefix() -> String {
    "hue2mqtt".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl MqttBrokerInfo {
    /// Creates broker settings with defaults for everything but the address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            enable_auth: false,
            username: String::new(),
            password: String::new(),
            enable_tls: false,
            topic_prefix: default_topic_prefix(),
            force_protocol_version_3_1: false,
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Enables authentication with the given credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.enable_auth = true;
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the topic prefix.
    #[must_use]
    pub fn with_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Selects MQTT 3.1.1 instead of MQTT 5.
    #[must_use]
    pub fn with_protocol_version_3_1(mut self) -> Self {
        self.force_protocol_version_3_1 = true;
        self
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Returns the connection acknowledgement timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Hue Bridge connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HueBridgeInfo {
    /// Bridge IP address.
    pub ip: String,
    /// API username issued by the bridge.
    pub username: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hue2MqttConfig {
    /// MQTT broker settings.
    pub mqtt: MqttBrokerInfo,
    /// Hue Bridge settings.
    pub hue: HueBridgeInfo,
}

impl Hue2MqttConfig {
    /// Loads the configuration from `path`, or from the first existing file
    /// among `hue2mqtt.toml` and `/etc/hue2mqtt.toml` when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no file exists, or an I/O or
    /// parse error if the file cannot be read or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::find_config_path(path)?;
        tracing::debug!(path = %path.display(), "Loading configuration");
        Self::load_from_path(&path)
    }

    /// Loads the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses the configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid for the schema.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn find_config_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let candidates: Vec<PathBuf> = match path {
            Some(path) => vec![path.to_path_buf()],
            None => CONFIG_SEARCH_PATHS.iter().map(|p| PathBuf::from(*p)).collect(),
        };

        candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| {
                let searched: Vec<String> =
                    candidates.iter().map(|p| p.display().to_string()).collect();
                ConfigError::NotFound(searched.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [mqtt]
        host = "localhost"
        port = 1883

        [hue]
        ip = "192.168.1.2"
        username = "abcdefg"
    "#;

    #[test]
    fn parse_valid_config() {
        let config = Hue2MqttConfig::from_toml_str(VALID).unwrap();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.hue.ip, "192.168.1.2");
        assert_eq!(config.hue.username, "abcdefg");
    }

    #[test]
    fn broker_defaults() {
        let config = Hue2MqttConfig::from_toml_str(VALID).unwrap();
        assert_eq!(config.mqtt, MqttBrokerInfo::new("localhost", 1883));
        assert_eq!(config.mqtt.topic_prefix, "hue2mqtt");
        assert!(!config.mqtt.enable_auth);
        assert!(!config.mqtt.enable_tls);
        assert!(!config.mqtt.force_protocol_version_3_1);
        assert_eq!(config.mqtt.keep_alive(), Duration::from_secs(30));
        assert_eq!(config.mqtt.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn full_broker_section() {
        let config = Hue2MqttConfig::from_toml_str(
            r#"
            [mqtt]
            host = "broker"
            port = 8883
            enable_auth = true
            username = "user"
            password = "pass"
            enable_tls = true
            topic_prefix = "home/hue"
            force_protocol_version_3_1 = true

            [hue]
            ip = "10.0.0.2"
            username = "key"
            "#,
        )
        .unwrap();

        let expected = MqttBrokerInfo::new("broker", 8883)
            .with_credentials("user", "pass")
            .with_topic_prefix("home/hue")
            .with_protocol_version_3_1();
        assert_eq!(
            config.mqtt,
            MqttBrokerInfo {
                enable_tls: true,
                ..expected
            }
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let result = Hue2MqttConfig::from_toml_str(
            r#"
            [mqtt]
            host = "localhost"
            port = 1883
            colour = "blue"

            [hue]
            ip = "192.168.1.2"
            username = "abcdefg"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_section_rejected() {
        let result = Hue2MqttConfig::from_toml_str("[mqtt]\nhost = \"a\"\nport = 1\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn explicit_missing_path_not_found() {
        let result = Hue2MqttConfig::load(Some(Path::new("/nonexistent/hue2mqtt.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("hue2mqtt-{}.toml", std::process::id()));
        std::fs::write(&path, VALID).unwrap();

        let config = Hue2MqttConfig::load(Some(&path)).unwrap();
        assert_eq!(config.mqtt.host, "localhost");

        std::fs::remove_file(&path).unwrap();
    }
}
