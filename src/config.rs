// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gateway configuration.
//!
//! The configuration is a JSON document; every field is optional:
//!
//! ```json
//! {
//!   "network": { "udp_port": 6454, "bind_address": "0.0.0.0", "max_udp_buffer_size": 1024 },
//!   "dmx": {
//!     "fade_interval_ms": 10,
//!     "frame_interval_ms": 30,
//!     "write_lock_timeout_ms": 100,
//!     "read_lock_timeout_ms": 10,
//!     "serial_port": "/dev/ttyUSB0"
//!   },
//!   "ct_config": { "1": 2700, "2": 6500 },
//!   "default_ct": { "min": 3500, "max": 6700 }
//! }
//! ```
//!
//! # Examples
//!
//! ```
//! use udp2dmx::config::GatewayConfig;
//!
//! let config = GatewayConfig::from_json(r#"{ "network": { "udp_port": 7000 } }"#).unwrap();
//! assert_eq!(config.network.udp_port, 7000);
//! assert_eq!(config.network.max_udp_buffer_size, 1024);
//!
//! assert!(GatewayConfig::from_json(r#"{ "network": { "udp_port": 0 } }"#).is_err());
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color_temp::{CtConfig, CtSection};
use crate::engine::{DEFAULT_FADE_INTERVAL, DEFAULT_FRAME_INTERVAL};
use crate::error::ConfigError;
use crate::protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_UDP_PORT};
use crate::state::StoreTimeouts;
use crate::types::UNIVERSE_SIZE;

/// Largest accepted receive buffer.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Longest accepted task interval in milliseconds.
pub const MAX_INTERVAL_MS: u64 = 1000;

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP port to listen on.
    pub udp_port: u16,
    /// Address to bind.
    pub bind_address: IpAddr,
    /// Receive buffer size; must exceed one universe.
    pub max_udp_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_udp_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Channel engine and bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmxConfig {
    /// Fade scheduler period.
    pub fade_interval_ms: u64,
    /// Frame transmitter period.
    pub frame_interval_ms: u64,
    /// Store lock timeout for writes and task ticks.
    pub write_lock_timeout_ms: u64,
    /// Store lock timeout for status reads.
    pub read_lock_timeout_ms: u64,
    /// Serial device of the DMX adapter; none runs without hardware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_port: Option<String>,
}

impl Default for DmxConfig {
    fn default() -> Self {
        Self {
            fade_interval_ms: millis(DEFAULT_FADE_INTERVAL),
            frame_interval_ms: millis(DEFAULT_FRAME_INTERVAL),
            write_lock_timeout_ms: millis(StoreTimeouts::DEFAULT_WRITE),
            read_lock_timeout_ms: millis(StoreTimeouts::DEFAULT_READ),
            serial_port: None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Channel engine and bus settings.
    pub dmx: DmxConfig,
    /// Color-temperature entries, stored at the top level.
    #[serde(flatten)]
    pub color_temperature: CtSection,
}

impl GatewayConfig {
    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, `Json` if it is
    /// malformed, or `Invalid` if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is malformed, or `Invalid` if
    /// a value is out of range.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.udp_port == 0 {
            return Err(invalid("network.udp_port", "must not be 0"));
        }
        let buffer = self.network.max_udp_buffer_size;
        if !(UNIVERSE_SIZE + 1..=MAX_BUFFER_SIZE).contains(&buffer) {
            return Err(invalid(
                "network.max_udp_buffer_size",
                format!("{buffer} is outside {}..={MAX_BUFFER_SIZE}", UNIVERSE_SIZE + 1),
            ));
        }
        for (field, value) in [
            ("dmx.fade_interval_ms", self.dmx.fade_interval_ms),
            ("dmx.frame_interval_ms", self.dmx.frame_interval_ms),
        ] {
            if !(1..=MAX_INTERVAL_MS).contains(&value) {
                return Err(invalid(field, format!("{value} is outside 1..={MAX_INTERVAL_MS}")));
            }
        }
        for (field, value) in [
            ("dmx.write_lock_timeout_ms", self.dmx.write_lock_timeout_ms),
            ("dmx.read_lock_timeout_ms", self.dmx.read_lock_timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must not be 0"));
            }
        }
        Ok(())
    }

    // ========== Derived values ==========

    /// Socket address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.bind_address, self.network.udp_port)
    }

    /// Fade scheduler period.
    #[must_use]
    pub fn fade_interval(&self) -> Duration {
        Duration::from_millis(self.dmx.fade_interval_ms)
    }

    /// Frame transmitter period.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.dmx.frame_interval_ms)
    }

    /// Store lock timeouts.
    #[must_use]
    pub fn store_timeouts(&self) -> StoreTimeouts {
        StoreTimeouts {
            write: Duration::from_millis(self.dmx.write_lock_timeout_ms),
            read: Duration::from_millis(self.dmx.read_lock_timeout_ms),
        }
    }

    /// Validated color-temperature configuration.
    #[must_use]
    pub fn ct_config(&self) -> CtConfig {
        CtConfig::from_section(&self.color_temperature)
    }

    /// Logs the effective settings.
    pub fn log_summary(&self) {
        tracing::info!(
            bind = %self.bind_addr(),
            buffer_size = self.network.max_udp_buffer_size,
            fade_interval_ms = self.dmx.fade_interval_ms,
            frame_interval_ms = self.dmx.frame_interval_ms,
            serial_port = self.dmx.serial_port.as_deref().unwrap_or("none"),
            ct_channels = self.color_temperature.ct_config.len(),
            "Gateway configuration"
        );
    }

    // ========== Overrides ==========

    /// Sets the UDP port.
    #[must_use]
    pub fn with_udp_port(mut self, port: u16) -> Self {
        self.network.udp_port = port;
        self
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.network.bind_address = address;
        self
    }

    /// Sets the serial device of the DMX adapter.
    #[must_use]
    pub fn with_serial_port(mut self, port: impl Into<String>) -> Self {
        self.dmx.serial_port = Some(port.into());
        self
    }

    /// Replaces the color-temperature entries.
    #[must_use]
    pub fn with_color_temperature(mut self, config: &CtConfig) -> Self {
        self.color_temperature = config.to_section();
        self
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GatewayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:6454".parse().unwrap());
        assert_eq!(config.fade_interval(), DEFAULT_FADE_INTERVAL);
        assert_eq!(config.frame_interval(), DEFAULT_FRAME_INTERVAL);
        assert_eq!(config.dmx.fade_interval_ms, 10);
        assert_eq!(config.dmx.frame_interval_ms, 30);
        assert_eq!(config.store_timeouts(), StoreTimeouts::default());
        assert_eq!(config.dmx.serial_port, None);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(GatewayConfig::from_json("{}").unwrap(), GatewayConfig::default());
    }

    #[test]
    fn full_document() {
        let json = r#"{
            "network": { "udp_port": 7000, "bind_address": "127.0.0.1", "max_udp_buffer_size": 2048 },
            "dmx": { "fade_interval_ms": 20, "serial_port": "/dev/ttyUSB0" },
            "ct_config": { "1": 2700, "2": 6500 },
            "default_ct": { "min": 3000, "max": 6000 }
        }"#;
        let config = GatewayConfig::from_json(json).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.network.max_udp_buffer_size, 2048);
        assert_eq!(config.dmx.fade_interval_ms, 20);
        assert_eq!(config.dmx.frame_interval_ms, 30);
        assert_eq!(config.dmx.serial_port.as_deref(), Some("/dev/ttyUSB0"));

        let ct = config.ct_config();
        assert_eq!(ct.kelvin(1), Some(2700));
        assert_eq!(ct.defaults().min, 3000);
    }

    #[test]
    fn validation_names_the_field() {
        let cases = [
            (r#"{"network": {"udp_port": 0}}"#, "network.udp_port"),
            (r#"{"network": {"max_udp_buffer_size": 512}}"#, "network.max_udp_buffer_size"),
            (r#"{"network": {"max_udp_buffer_size": 8193}}"#, "network.max_udp_buffer_size"),
            (r#"{"dmx": {"fade_interval_ms": 0}}"#, "dmx.fade_interval_ms"),
            (r#"{"dmx": {"frame_interval_ms": 1001}}"#, "dmx.frame_interval_ms"),
            (r#"{"dmx": {"read_lock_timeout_ms": 0}}"#, "dmx.read_lock_timeout_ms"),
        ];
        for (json, expected) in cases {
            match GatewayConfig::from_json(json) {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected, "{json}"),
                other => panic!("expected invalid {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            GatewayConfig::from_json(r#"{"network": {"udp_port": "six"}}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn json_round_trip_keeps_color_temperature_flat() {
        let config = GatewayConfig::default()
            .with_udp_port(9000)
            .with_color_temperature(&CtConfig::default().with_channel(4, 3200));
        let json = config.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ct_config"]["4"], 3200);
        assert!(value.get("color_temperature").is_none());
        assert_eq!(GatewayConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            GatewayConfig::load("/nonexistent/udp2dmx.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn overrides() {
        let config = GatewayConfig::default()
            .with_bind_address("127.0.0.1".parse().unwrap())
            .with_serial_port("COM3");
        assert_eq!(config.bind_addr().ip().to_string(), "127.0.0.1");
        assert_eq!(config.dmx.serial_port.as_deref(), Some("COM3"));
    }
}
