// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel addressing within the universe.
//!
//! Channels are numbered from 1 on the wire. Channel `n` is stored in buffer
//! slot `n - 1`, so a full-universe packet's first byte is channel 1.

use std::ops::Range;

use crate::error::CommandError;

/// Number of channels in the universe.
pub const UNIVERSE_SIZE: usize = 512;

/// One full frame of channel values, slot 0 holding channel 1.
pub type Universe = [u8; UNIVERSE_SIZE];

/// A validated run of contiguous channels.
///
/// # Examples
///
/// ```
/// use udp2dmx::types::ChannelSpan;
///
/// let rgb = ChannelSpan::new(5, 3).unwrap();
/// assert_eq!(rgb.start(), 5);
/// assert_eq!(rgb.slots(), 4..7);
///
/// // Channel 511 has room for two slots, not three.
/// assert!(ChannelSpan::new(511, 2).is_ok());
/// assert!(ChannelSpan::new(511, 3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSpan {
    start: u16,
    width: u16,
}

impl ChannelSpan {
    /// Validates that `width` slots starting at `channel` fit in the universe.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidChannel` if `channel < 1`, `width` is
    /// zero, or the last slot lies past channel [`UNIVERSE_SIZE`].
    pub fn new(channel: i32, width: usize) -> Result<Self, CommandError> {
        let invalid = CommandError::InvalidChannel { channel, width };
        if channel < 1 || width == 0 || width > UNIVERSE_SIZE {
            return Err(invalid);
        }
        #[allow(clippy::cast_sign_loss)]
        let start = channel as usize;
        if start + width - 1 > UNIVERSE_SIZE {
            return Err(invalid);
        }
        #[allow(clippy::cast_possible_truncation)]
        let span = Self {
            start: start as u16,
            width: width as u16,
        };
        Ok(span)
    }

    /// A span covering the whole universe.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn universe() -> Self {
        Self {
            start: 1,
            width: UNIVERSE_SIZE as u16,
        }
    }

    /// First channel number (1-based).
    #[must_use]
    pub const fn start(&self) -> u16 {
        self.start
    }

    /// Number of channels in the span.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width as usize
    }

    /// Buffer slot indices covered by the span.
    #[must_use]
    pub const fn slots(&self) -> Range<usize> {
        let first = self.start as usize - 1;
        first..first + self.width as usize
    }
}

/// Returns the buffer slot for a single channel, if it is addressable.
#[must_use]
pub fn slot_of(channel: u16) -> Option<usize> {
    let channel = usize::from(channel);
    (1..=UNIVERSE_SIZE).contains(&channel).then(|| channel - 1)
}
