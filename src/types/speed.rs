// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Speed codes for channel transitions.
//!
//! Commands carry a compact, legacy speed code (nominally 0-255) that maps to
//! a fade duration through a fixed piecewise table. Codes outside every band
//! mean "instant".

use std::fmt;
use std::time::Duration;

/// A transition speed code as sent on the wire.
///
/// | code | duration |
/// |---|---|
/// | 255 | instant |
/// | 1-98 | `code * 591` ms |
/// | 101-104 | `(code - 100) * 146 + 1` ms |
/// | 201-254 | `(code - 200) * 72` ms |
/// | anything else | instant |
///
/// # Examples
///
/// ```
/// use udp2dmx::types::SpeedCode;
///
/// assert_eq!(SpeedCode::new(50).duration_ms(), 29_550);
/// assert_eq!(SpeedCode::new(103).duration_ms(), 439);
/// assert!(SpeedCode::INSTANT.is_instant());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SpeedCode(i32);

impl SpeedCode {
    /// The code used when a command carries no speed field.
    pub const INSTANT: Self = Self(255);

    /// Wraps a raw speed code. Every integer is accepted.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw code.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }

    /// Returns the fade duration in milliseconds (0 means instant).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn duration_ms(&self) -> u32 {
        match self.0 {
            1..=98 => self.0 as u32 * 591,
            101..=104 => (self.0 as u32 - 100) * 146 + 1,
            201..=254 => (self.0 as u32 - 200) * 72,
            _ => 0,
        }
    }

    /// Returns the fade duration.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms() as u64)
    }

    /// Returns whether this code requests an immediate write.
    #[must_use]
    pub const fn is_instant(&self) -> bool {
        self.duration_ms() == 0
    }
}

impl Default for SpeedCode {
    fn default() -> Self {
        Self::INSTANT
    }
}

impl fmt::Display for SpeedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SpeedCode {
    fn from(code: i32) -> Self {
        Self::new(code)
    }
}
