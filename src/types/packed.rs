// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-field values packed into a single decimal integer.
//!
//! The wire protocol transports several fields in one decimal number by
//! reserving digit groups:
//!
//! | Type | Layout | Example |
//! |---|---|---|
//! | [`RgbColor`] | `BBBGGGRRR` | `3066012` is R=12, G=66, B=3 |
//! | [`TunableWhite`] | `WWWCCC` | `200050` is WW=200, CW=50 |
//! | [`LightCt`] | `2BBBKKKK` (9 digits, leading `2`) | `200504000` is 50 % at 4000 K |
//!
//! Decoding clamps each group into its legal range; encoding is the inverse
//! for in-range fields.

use std::fmt;

/// Clamps an integer into `0..=255`.
pub(crate) fn clamp_u8(value: i64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = value.clamp(0, 255) as u8;
    clamped
}

/// An RGB triple packed as `B * 10^6 + G * 10^3 + R`.
///
/// # Examples
///
/// ```
/// use udp2dmx::types::RgbColor;
///
/// let color = RgbColor::unpack(3_066_012);
/// assert_eq!(color.channels(), [12, 66, 3]);
/// assert_eq!(color.pack(), 3_066_012);
///
/// // Groups above 255 saturate.
/// assert_eq!(RgbColor::unpack(999_000_300).channels(), [255, 0, 255]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RgbColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl RgbColor {
    /// Largest raw value the RGB encoding accepts.
    pub const MAX_PACKED: i32 = 999_999_999;

    /// Creates a color from its components.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Extracts the three digit groups, clamping each to 255.
    #[must_use]
    pub fn unpack(raw: i32) -> Self {
        let raw = i64::from(raw);
        Self {
            red: clamp_u8(raw % 1000),
            green: clamp_u8((raw / 1000) % 1000),
            blue: clamp_u8((raw / 1_000_000) % 1000),
        }
    }

    /// Packs the components back into the wire integer.
    #[must_use]
    pub fn pack(&self) -> i32 {
        i32::from(self.blue) * 1_000_000 + i32::from(self.green) * 1000 + i32::from(self.red)
    }

    /// Channel values in wire order (R, G, B).
    #[must_use]
    pub const fn channels(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Returns the red component.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Returns the green component.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Returns the blue component.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R={} G={} B={}", self.red, self.green, self.blue)
    }
}

/// A warm/cool white pair packed as `WW * 1000 + CW`.
///
/// # Examples
///
/// ```
/// use udp2dmx::types::TunableWhite;
///
/// let white = TunableWhite::unpack(200_050);
/// assert_eq!(white.channels(), [200, 50]);
/// assert_eq!(white.pack(), 200_050);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TunableWhite {
    warm: u8,
    cool: u8,
}

impl TunableWhite {
    /// Creates a pair from its components.
    #[must_use]
    pub const fn new(warm: u8, cool: u8) -> Self {
        Self { warm, cool }
    }

    /// Extracts both digit groups, clamping each into `0..=255`.
    #[must_use]
    pub fn unpack(raw: i32) -> Self {
        let raw = i64::from(raw);
        Self {
            warm: clamp_u8((raw / 1000) % 1000),
            cool: clamp_u8(raw % 1000),
        }
    }

    /// Packs the pair back into the wire integer.
    #[must_use]
    pub fn pack(&self) -> i32 {
        i32::from(self.warm) * 1000 + i32::from(self.cool)
    }

    /// Channel values in wire order (WW, CW).
    #[must_use]
    pub const fn channels(&self) -> [u8; 2] {
        [self.warm, self.cool]
    }

    /// Returns the warm white level.
    #[must_use]
    pub const fn warm(&self) -> u8 {
        self.warm
    }

    /// Returns the cool white level.
    #[must_use]
    pub const fn cool(&self) -> u8 {
        self.cool
    }
}

/// Brightness plus color temperature, packed as `200_000_000 + B * 10^4 + K`.
///
/// Only values in [`LightCt::ENVELOPE_MIN`]`..=`[`LightCt::ENVELOPE_MAX`] are
/// valid; the leading `2` guards against truncated or unrelated numbers.
///
/// # Examples
///
/// ```
/// use udp2dmx::types::LightCt;
///
/// let light = LightCt::unpack(200_504_000).unwrap();
/// assert_eq!(light.brightness(), 50);
/// assert_eq!(light.kelvin(), 4000);
/// assert_eq!(light.pack(), 200_504_000);
///
/// assert!(LightCt::unpack(199_999_999).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LightCt {
    brightness: u8,
    kelvin: u16,
}

impl LightCt {
    /// Smallest valid packed value.
    pub const ENVELOPE_MIN: i32 = 200_000_000;

    /// Largest valid packed value.
    pub const ENVELOPE_MAX: i32 = 209_999_999;

    /// Maximum brightness in percent.
    pub const MAX_BRIGHTNESS: u8 = 100;

    /// Creates a value, clamping brightness to 100 % and Kelvin to 4 digits.
    #[must_use]
    pub fn new(brightness: u8, kelvin: u16) -> Self {
        Self {
            brightness: brightness.min(Self::MAX_BRIGHTNESS),
            kelvin: kelvin.min(9999),
        }
    }

    /// Decodes a packed value, or `None` when it is outside the envelope.
    ///
    /// Brightness digits above 100 clamp to 100.
    #[must_use]
    pub fn unpack(raw: i32) -> Option<Self> {
        if !(Self::ENVELOPE_MIN..=Self::ENVELOPE_MAX).contains(&raw) {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let light = Self {
            brightness: ((raw / 10_000) % 1000).min(i32::from(Self::MAX_BRIGHTNESS)) as u8,
            kelvin: (raw % 10_000) as u16,
        };
        Some(light)
    }

    /// Packs the value back into the wire integer.
    #[must_use]
    pub fn pack(&self) -> i32 {
        Self::ENVELOPE_MIN + i32::from(self.brightness) * 10_000 + i32::from(self.kelvin)
    }

    /// Brightness in percent (0-100).
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Requested color temperature in Kelvin.
    #[must_use]
    pub const fn kelvin(&self) -> u16 {
        self.kelvin
    }
}

impl fmt::Display for LightCt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}% @ {}K", self.brightness, self.kelvin)
    }
}
