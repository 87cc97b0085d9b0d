// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color-temperature resolution for tunable-white channel pairs.
//!
//! A fixture with a warm and a cool white emitter occupies two adjacent
//! channels. Each channel may be configured with the Kelvin value of its
//! emitter:
//!
//! ```json
//! {
//!   "ct_config": { "1": 2700, "2": 6500 },
//!   "default_ct": { "min": 3500, "max": 6700 }
//! }
//! ```
//!
//! [`ColorTempSource::resolve`] turns that into a [`CtRange`], sorted so the
//! warm bound is never above the cool bound, and falls back to the defaults
//! for unconfigured channels.
//!
//! # Examples
//!
//! ```
//! use udp2dmx::color_temp::{ColorTempSource, CtConfig};
//!
//! // Channel 10 is cool, channel 11 is warm.
//! let config = CtConfig::default()
//!     .with_channel(10, 6500)
//!     .with_channel(11, 2700);
//!
//! let range = config.resolve(10);
//! assert_eq!(range.warm_kelvin, 2700);
//! assert_eq!(range.warm_channel, 11);
//! assert_eq!(range.cool_kelvin, 6500);
//! assert_eq!(range.cool_channel, 10);
//! ```

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::UNIVERSE_SIZE;

/// Kelvin used for a missing lower channel.
pub const DEFAULT_MIN_KELVIN: u16 = 3500;

/// Kelvin used for a missing upper channel.
pub const DEFAULT_MAX_KELVIN: u16 = 6700;

// ========== Wire shape ==========

/// Fallback bounds for channels without an explicit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCt {
    /// Kelvin substituted for the first channel of a pair.
    #[serde(default = "default_min")]
    pub min: u16,
    /// Kelvin substituted for the second channel of a pair.
    #[serde(default = "default_max")]
    pub max: u16,
}

const fn default_min() -> u16 {
    DEFAULT_MIN_KELVIN
}

const fn default_max() -> u16 {
    DEFAULT_MAX_KELVIN
}

impl Default for DefaultCt {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_KELVIN,
            max: DEFAULT_MAX_KELVIN,
        }
    }
}

/// The color-temperature section as stored by the configuration owner.
///
/// Keys of `ct_config` are channel numbers as strings, values are Kelvin.
/// Entries are kept raw here; [`CtConfig::from_section`] validates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtSection {
    /// Per-channel emitter temperature.
    #[serde(default)]
    pub ct_config: BTreeMap<String, u32>,
    /// Fallback bounds.
    #[serde(default)]
    pub default_ct: DefaultCt,
}

// ========== Resolved form ==========

/// The color-temperature bounds for one channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtRange {
    /// Lower (warmer) bound in Kelvin.
    pub warm_kelvin: u16,
    /// Upper (cooler) bound in Kelvin.
    pub cool_kelvin: u16,
    /// Channel driving the warm emitter.
    pub warm_channel: u16,
    /// Channel driving the cool emitter.
    pub cool_channel: u16,
}

impl CtRange {
    /// Width of the range in Kelvin; zero for a degenerate pair.
    #[must_use]
    pub fn span(&self) -> i32 {
        i32::from(self.cool_kelvin) - i32::from(self.warm_kelvin)
    }

    /// The lower of the two channel numbers.
    #[must_use]
    pub fn first_channel(&self) -> u16 {
        self.warm_channel.min(self.cool_channel)
    }
}

/// Anything that can resolve a channel pair to its color-temperature range.
///
/// The gateway reads through this trait only; the configuration itself is
/// owned elsewhere.
pub trait ColorTempSource: Send + Sync {
    /// Resolves the pair `(channel, channel + 1)`.
    fn resolve(&self, channel: u16) -> CtRange;
}

/// Validated color-temperature configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtConfig {
    channels: BTreeMap<u16, u16>,
    defaults: DefaultCt,
}

impl CtConfig {
    /// Builds a configuration from its stored form.
    ///
    /// Entries whose channel is not a number in `1..=512`, whose Kelvin value
    /// is zero, or whose Kelvin value does not fit in 16 bits are skipped with
    /// a warning. Swapped defaults are put back in order.
    #[must_use]
    pub fn from_section(section: &CtSection) -> Self {
        let mut channels = BTreeMap::new();
        for (key, &kelvin) in &section.ct_config {
            let channel = match key.trim().parse::<u16>() {
                Ok(ch) if (1..=UNIVERSE_SIZE).contains(&usize::from(ch)) => ch,
                _ => {
                    tracing::warn!(key = %key, "Ignoring color temperature for invalid channel");
                    continue;
                }
            };
            match u16::try_from(kelvin) {
                Ok(k) if k > 0 => {
                    channels.insert(channel, k);
                }
                _ => {
                    tracing::warn!(channel, kelvin, "Ignoring out-of-range color temperature");
                }
            }
        }

        let mut defaults = section.default_ct;
        if defaults.min > defaults.max {
            tracing::warn!(
                min = defaults.min,
                max = defaults.max,
                "Default color temperature bounds are swapped, reordering"
            );
            std::mem::swap(&mut defaults.min, &mut defaults.max);
        }

        Self { channels, defaults }
    }

    /// Parses and validates the JSON form.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is not a valid section.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let section: CtSection = serde_json::from_str(text)?;
        Ok(Self::from_section(&section))
    }

    /// Converts back to the stored form.
    #[must_use]
    pub fn to_section(&self) -> CtSection {
        CtSection {
            ct_config: self
                .channels
                .iter()
                .map(|(ch, k)| (ch.to_string(), u32::from(*k)))
                .collect(),
            default_ct: self.defaults,
        }
    }

    /// Sets the temperature of one channel.
    #[must_use]
    pub fn with_channel(mut self, channel: u16, kelvin: u16) -> Self {
        self.channels.insert(channel, kelvin);
        self
    }

    /// Sets the fallback bounds.
    #[must_use]
    pub fn with_defaults(mut self, min: u16, max: u16) -> Self {
        self.defaults = DefaultCt { min, max };
        self
    }

    /// Returns the configured temperature of a channel.
    #[must_use]
    pub fn kelvin(&self, channel: u16) -> Option<u16> {
        self.channels.get(&channel).copied()
    }

    /// Returns the fallback bounds.
    #[must_use]
    pub const fn defaults(&self) -> DefaultCt {
        self.defaults
    }
}

impl ColorTempSource for CtConfig {
    fn resolve(&self, channel: u16) -> CtRange {
        let next = channel.saturating_add(1);

        let first = self.kelvin(channel).unwrap_or_else(|| {
            tracing::warn!(
                channel,
                kelvin = self.defaults.min,
                "No color temperature configured, using default"
            );
            self.defaults.min
        });
        let second = self.kelvin(next).unwrap_or_else(|| {
            tracing::warn!(
                channel = next,
                kelvin = self.defaults.max,
                "No color temperature configured, using default"
            );
            self.defaults.max
        });

        if first < second {
            CtRange {
                warm_kelvin: first,
                cool_kelvin: second,
                warm_channel: channel,
                cool_channel: next,
            }
        } else {
            CtRange {
                warm_kelvin: second,
                cool_kelvin: first,
                warm_channel: next,
                cool_channel: channel,
            }
        }
    }
}

impl ColorTempSource for RwLock<CtConfig> {
    fn resolve(&self, channel: u16) -> CtRange {
        self.read().resolve(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_pair() {
        let config = CtConfig::default().with_channel(1, 2700).with_channel(2, 6500);
        assert_eq!(
            config.resolve(1),
            CtRange {
                warm_kelvin: 2700,
                cool_kelvin: 6500,
                warm_channel: 1,
                cool_channel: 2,
            }
        );
    }

    #[test]
    fn descending_pair_is_sorted() {
        let config = CtConfig::default().with_channel(1, 6500).with_channel(2, 2700);
        let range = config.resolve(1);
        assert_eq!(range.warm_kelvin, 2700);
        assert_eq!(range.warm_channel, 2);
        assert_eq!(range.cool_channel, 1);
        assert_eq!(range.first_channel(), 1);
    }

    #[test]
    fn missing_entries_use_defaults() {
        let config = CtConfig::default();
        let range = config.resolve(40);
        assert_eq!(range.warm_kelvin, DEFAULT_MIN_KELVIN);
        assert_eq!(range.cool_kelvin, DEFAULT_MAX_KELVIN);
        assert_eq!(range.warm_channel, 40);
        assert_eq!(range.cool_channel, 41);
    }

    #[test]
    fn missing_second_entry_uses_max_default() {
        let config = CtConfig::default().with_channel(5, 7000);
        let range = config.resolve(5);
        // 7000 from channel 5, 6700 default for channel 6
        assert_eq!(range.warm_kelvin, 6700);
        assert_eq!(range.warm_channel, 6);
        assert_eq!(range.cool_kelvin, 7000);
    }

    #[test]
    fn equal_bounds_have_zero_span() {
        let config = CtConfig::default().with_channel(3, 4000).with_channel(4, 4000);
        let range = config.resolve(3);
        assert_eq!(range.span(), 0);
    }

    #[test]
    fn from_json_skips_bad_entries() {
        let json = r#"{
            "ct_config": { "1": 2700, "2": 6500, "0": 3000, "600": 3000, "x": 3000, "7": 0, "8": 70000 },
            "default_ct": { "min": 3000, "max": 6000 }
        }"#;
        let config = CtConfig::from_json(json).unwrap();
        assert_eq!(config.kelvin(1), Some(2700));
        assert_eq!(config.kelvin(2), Some(6500));
        assert_eq!(config.kelvin(0), None);
        assert_eq!(config.kelvin(7), None);
        assert_eq!(config.kelvin(8), None);
        assert_eq!(config.defaults(), DefaultCt { min: 3000, max: 6000 });
    }

    #[test]
    fn from_json_fills_missing_sections() {
        let config = CtConfig::from_json("{}").unwrap();
        assert_eq!(config, CtConfig::default());

        let config = CtConfig::from_json(r#"{"default_ct": {"max": 6000}}"#).unwrap();
        assert_eq!(config.defaults(), DefaultCt { min: DEFAULT_MIN_KELVIN, max: 6000 });
    }

    #[test]
    fn swapped_defaults_are_reordered() {
        let config = CtConfig::from_json(r#"{"default_ct": {"min": 6000, "max": 3000}}"#).unwrap();
        assert_eq!(config.defaults(), DefaultCt { min: 3000, max: 6000 });
    }

    #[test]
    fn from_json_rejects_malformed_text() {
        assert!(matches!(
            CtConfig::from_json("{ ct_config"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn section_round_trip() {
        let config = CtConfig::default().with_channel(9, 3000).with_defaults(2000, 7000);
        assert_eq!(CtConfig::from_section(&config.to_section()), config);
    }

    #[test]
    fn rwlock_source_sees_replacement() {
        let shared = RwLock::new(CtConfig::default());
        assert_eq!(shared.resolve(1).warm_kelvin, DEFAULT_MIN_KELVIN);

        *shared.write() = CtConfig::default().with_channel(1, 2200);
        assert_eq!(shared.resolve(1).warm_kelvin, 2200);
    }
}
