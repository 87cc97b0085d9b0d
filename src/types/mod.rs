// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for the gateway.
//!
//! # Types
//!
//! - [`ChannelSpan`] - A validated run of contiguous channels
//! - [`Universe`] - One full frame of [`UNIVERSE_SIZE`] channel values
//! - [`SpeedCode`] - Wire speed code mapped to a fade duration
//! - [`RgbColor`] - Packed `BBBGGGRRR` color
//! - [`TunableWhite`] - Packed `WWWCCC` white pair
//! - [`LightCt`] - Packed brightness plus color temperature

mod channel;
mod packed;
mod speed;

pub use channel::{ChannelSpan, UNIVERSE_SIZE, Universe, slot_of};
pub(crate) use packed::clamp_u8;
pub use packed::{LightCt, RgbColor, TunableWhite};
pub use speed::SpeedCode;
