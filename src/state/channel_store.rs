// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The shared channel buffer and its per-channel fade table.

use std::time::{Duration, Instant};

use crate::error::{CommandError, LockTimeout};
use crate::types::{ChannelSpan, UNIVERSE_SIZE, Universe, slot_of};

use super::Guarded;
use super::fade::{Fade, FadeStep};

const RESOURCE: &str = "channel store";

/// Lock timeouts used by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    /// Bound for writes and periodic task ticks.
    pub write: Duration,
    /// Bound for status reads, where a stale answer is acceptable.
    pub read: Duration,
}

impl StoreTimeouts {
    /// Default write timeout (100 ms).
    pub const DEFAULT_WRITE: Duration = Duration::from_millis(100);

    /// Default read timeout (10 ms).
    pub const DEFAULT_READ: Duration = Duration::from_millis(10);
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            write: Self::DEFAULT_WRITE,
            read: Self::DEFAULT_READ,
        }
    }
}

/// Outcome of one fade scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeTick {
    /// Whether any channel value moved.
    pub changed: bool,
    /// Fades still running after the tick.
    pub active: usize,
    /// The updated frame, present only when something changed.
    pub frame: Option<Universe>,
}

#[derive(Debug)]
struct Channels {
    values: Universe,
    fades: [Option<Fade>; UNIVERSE_SIZE],
}

impl Channels {
    const fn new() -> Self {
        Self {
            values: [0; UNIVERSE_SIZE],
            fades: [None; UNIVERSE_SIZE],
        }
    }

    /// Fades to `value` when a duration is given and the value differs,
    /// otherwise writes it and drops any running fade.
    fn write_slot(&mut self, slot: usize, value: u8, fade: Duration, now: Instant) {
        let current = self.values[slot];
        if !fade.is_zero() && current != value {
            self.fades[slot] = Some(Fade::new(current, value, fade, now));
        } else {
            self.values[slot] = value;
            self.fades[slot] = None;
        }
    }
}

/// Owner of the 512-slot universe and its fade state.
///
/// Every operation takes the single store lock for its whole duration and
/// releases it before returning. Values are addressed by 1-based channel
/// number; see [`crate::types::ChannelSpan`] for the addressing rules.
///
/// A channel is either idle or fading. A fade starts on a write that asks for
/// one and ends when the scheduler reaches its duration, or earlier when any
/// other write lands on the channel. [`ChannelStore::bulk_replace`] ends every
/// fade at once.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use udp2dmx::state::ChannelStore;
///
/// let store = ChannelStore::new();
/// store.set_immediate(1, 200).unwrap();
/// assert_eq!(store.get(1).unwrap(), 200);
///
/// store.start_fade(1, 0, Duration::from_secs(2)).unwrap();
/// assert!(store.is_fading(1).unwrap());
///
/// // Any later write on the channel supersedes the fade.
/// store.set_immediate(1, 50).unwrap();
/// assert!(!store.is_fading(1).unwrap());
/// ```
#[derive(Debug)]
pub struct ChannelStore {
    channels: Guarded<Channels>,
    timeouts: StoreTimeouts,
}

impl Default for ChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStore {
    /// Creates a dark universe with default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeouts(StoreTimeouts::default())
    }

    /// Creates a dark universe with the given timeouts.
    #[must_use]
    pub fn with_timeouts(timeouts: StoreTimeouts) -> Self {
        Self {
            channels: Guarded::new(RESOURCE, Channels::new()),
            timeouts,
        }
    }

    /// Returns the configured timeouts.
    #[must_use]
    pub const fn timeouts(&self) -> StoreTimeouts {
        self.timeouts
    }

    // ========== Single channel ==========

    /// Reads the current value of a channel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` outside `1..=512`, or `LockTimeout` if the
    /// read timeout elapses.
    pub fn get(&self, channel: u16) -> Result<u8, CommandError> {
        let slot = Self::slot(channel)?;
        Ok(self.channels.with(self.timeouts.read, |c| c.values[slot])?)
    }

    /// Reports whether a fade is running on a channel.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelStore::get`].
    pub fn is_fading(&self, channel: u16) -> Result<bool, CommandError> {
        let slot = Self::slot(channel)?;
        Ok(self.channels.with(self.timeouts.read, |c| c.fades[slot].is_some())?)
    }

    /// Writes a value immediately, cancelling any fade on the channel.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` outside `1..=512`, or `LockTimeout` if the
    /// write timeout elapses.
    pub fn set_immediate(&self, channel: u16, value: u8) -> Result<(), CommandError> {
        let slot = Self::slot(channel)?;
        self.channels.with(self.timeouts.write, |c| {
            c.values[slot] = value;
            c.fades[slot] = None;
        })?;
        tracing::debug!(channel, value, "Channel set");
        Ok(())
    }

    /// Starts fading a channel from its current value to `target`.
    ///
    /// A zero duration writes the target immediately.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelStore::set_immediate`].
    pub fn start_fade(&self, channel: u16, target: u8, duration: Duration) -> Result<(), CommandError> {
        self.start_fade_at(channel, target, duration, Instant::now())
    }

    /// Like [`ChannelStore::start_fade`], with an explicit start instant.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelStore::set_immediate`].
    pub fn start_fade_at(
        &self,
        channel: u16,
        target: u8,
        duration: Duration,
        now: Instant,
    ) -> Result<(), CommandError> {
        let slot = Self::slot(channel)?;
        self.channels.with(self.timeouts.write, |c| {
            if duration.is_zero() {
                c.values[slot] = target;
                c.fades[slot] = None;
            } else {
                c.fades[slot] = Some(Fade::new(c.values[slot], target, duration, now));
            }
        })?;
        tracing::debug!(
            channel,
            target,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "Fade started"
        );
        Ok(())
    }

    /// Stops the fade on a channel, leaving its value where it is.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelStore::set_immediate`].
    pub fn cancel_fade(&self, channel: u16) -> Result<(), CommandError> {
        let slot = Self::slot(channel)?;
        self.channels.with(self.timeouts.write, |c| c.fades[slot] = None)?;
        Ok(())
    }

    // ========== Grouped writes ==========

    /// Writes contiguous channels starting at `start`, fading where asked.
    ///
    /// Each slot follows the same rule: with a non-zero `fade` and a value
    /// different from the current one a fade starts, otherwise the value is
    /// written at once and any fade on that slot is dropped. The whole group
    /// is applied under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` if the group does not fit in the universe
    /// (nothing is written), or `LockTimeout` if the write timeout elapses.
    pub fn set_with_optional_fade(&self, start: u16, values: &[u8], fade: Duration) -> Result<(), CommandError> {
        self.set_with_optional_fade_at(start, values, fade, Instant::now())
    }

    /// Like [`ChannelStore::set_with_optional_fade`], with an explicit fade
    /// start instant.
    ///
    /// # Errors
    ///
    /// Same as [`ChannelStore::set_with_optional_fade`].
    pub fn set_with_optional_fade_at(
        &self,
        start: u16,
        values: &[u8],
        fade: Duration,
        now: Instant,
    ) -> Result<(), CommandError> {
        let span = ChannelSpan::new(i32::from(start), values.len())?;
        self.channels.with(self.timeouts.write, |c| {
            for (slot, &value) in span.slots().zip(values) {
                c.write_slot(slot, value, fade, now);
            }
        })?;
        tracing::debug!(
            start,
            count = values.len(),
            fade_ms = u64::try_from(fade.as_millis()).unwrap_or(u64::MAX),
            "Channels written"
        );
        Ok(())
    }

    // ========== Whole universe ==========

    /// Replaces every channel and cancels every fade.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if the write timeout elapses.
    pub fn bulk_replace(&self, frame: &Universe) -> Result<(), LockTimeout> {
        let span = ChannelSpan::universe();
        self.channels.with(self.timeouts.write, |c| {
            c.values[span.slots()].copy_from_slice(frame);
            c.fades[span.slots()].fill(None);
        })?;
        tracing::debug!(first = span.start(), channels = span.width(), "Universe replaced");
        Ok(())
    }

    /// Cancels every fade, leaving values where they are.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if the write timeout elapses.
    pub fn stop_all_fades(&self) -> Result<(), LockTimeout> {
        self.channels.with(self.timeouts.write, |c| c.fades = [None; UNIVERSE_SIZE])
    }

    /// Copies the whole buffer.
    ///
    /// Uses the write timeout, since the frame transmitter relies on it.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if the timeout elapses.
    pub fn snapshot(&self) -> Result<Universe, LockTimeout> {
        self.channels.with(self.timeouts.write, |c| c.values)
    }

    /// Counts running fades.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if the read timeout elapses.
    pub fn active_fades(&self) -> Result<usize, LockTimeout> {
        self.channels
            .with(self.timeouts.read, |c| c.fades.iter().flatten().count())
    }

    /// Advances every running fade to `now`.
    ///
    /// Finished fades write their exact target and are removed.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` if the write timeout elapses; no fade moves.
    pub fn advance_fades(&self, now: Instant) -> Result<FadeTick, LockTimeout> {
        self.channels.with(self.timeouts.write, |c| {
            let mut changed = false;
            let mut active = 0;
            for (value, slot_fade) in c.values.iter_mut().zip(c.fades.iter_mut()) {
                let Some(fade) = *slot_fade else { continue };
                let step = fade.sample(now);
                match step {
                    FadeStep::Done(_) => *slot_fade = None,
                    FadeStep::Running(_) => active += 1,
                }
                if *value != step.value() {
                    *value = step.value();
                    changed = true;
                }
            }
            FadeTick {
                changed,
                active,
                frame: changed.then_some(c.values),
            }
        })
    }

    fn slot(channel: u16) -> Result<usize, CommandError> {
        slot_of(channel).ok_or(CommandError::InvalidChannel {
            channel: i32::from(channel),
            width: 1,
        })
    }
}
