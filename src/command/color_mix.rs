// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Warm/cool white mixing for a target color temperature.

use crate::color_temp::CtRange;
use crate::error::CommandError;
use crate::types::{LightCt, clamp_u8};

/// Temperatures within this distance of a bound use that emitter alone.
const PURE_BAND_KELVIN: i32 = 100;

/// Mixed outputs below this share of full scale are switched off.
const TRICKLE_PERCENT: u32 = 2;

/// Output levels for a warm/cool emitter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhiteMix {
    /// Warm white level.
    pub warm: u8,
    /// Cool white level.
    pub cool: u8,
}

impl WhiteMix {
    /// Places both levels at their offset relative to the lower channel.
    ///
    /// Returns the start channel and the two values in channel order.
    #[must_use]
    pub fn channel_values(&self, range: &CtRange) -> (u16, [u8; 2]) {
        let start = range.first_channel();
        let mut values = [0_u8; 2];
        values[usize::from(range.warm_channel - start)] = self.warm;
        values[usize::from(range.cool_channel - start)] = self.cool;
        (start, values)
    }
}

/// Computes the warm and cool levels for a brightness and color temperature.
///
/// The requested temperature is clamped into the range first. Within 100 K of
/// either bound only the matching emitter lights, at `brightness * 255 / 100`.
/// In between, both emitters share the brightness linearly, rounded to the
/// nearest step, and a share under 2 % of full scale is dropped.
///
/// # Errors
///
/// Returns `CommandError::ConfigMissing` if the range is empty.
///
/// # Examples
///
/// ```
/// use udp2dmx::color_temp::CtRange;
/// use udp2dmx::command::{mix_white, WhiteMix};
/// use udp2dmx::types::LightCt;
///
/// let range = CtRange { warm_kelvin: 3000, cool_kelvin: 6500, warm_channel: 1, cool_channel: 2 };
/// let mix = mix_white(LightCt::new(100, 4750), &range).unwrap();
/// assert_eq!(mix, WhiteMix { warm: 128, cool: 128 });
/// ```
pub fn mix_white(light: LightCt, range: &CtRange) -> Result<WhiteMix, CommandError> {
    let span = range.span();
    if span <= 0 {
        return Err(CommandError::ConfigMissing {
            channel: range.first_channel(),
        });
    }

    let warm_k = i32::from(range.warm_kelvin);
    let cool_k = i32::from(range.cool_kelvin);
    let kelvin = i32::from(light.kelvin()).clamp(warm_k, cool_k);
    let brightness = i64::from(light.brightness());
    let full = clamp_u8(brightness * 255 / 100);

    if kelvin <= warm_k + PURE_BAND_KELVIN {
        return Ok(WhiteMix { warm: full, cool: 0 });
    }
    if kelvin >= cool_k - PURE_BAND_KELVIN {
        return Ok(WhiteMix { warm: 0, cool: full });
    }

    let den = i64::from(span) * 100;
    let share = |distance: i32| {
        let num = brightness * i64::from(distance) * 255;
        suppress_trickle(clamp_u8((num + den / 2) / den))
    };

    Ok(WhiteMix {
        warm: share(cool_k - kelvin),
        cool: share(kelvin - warm_k),
    })
}

fn suppress_trickle(level: u8) -> u8 {
    if u32::from(level) * 100 / 255 < TRICKLE_PERCENT {
        0
    } else {
        level
    }
}
