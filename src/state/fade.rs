// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Linear transition of one channel.

use std::time::{Duration, Instant};

use crate::types::clamp_u8;

/// An in-flight transition from `start_value` to `target_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    start_value: u8,
    target_value: u8,
    duration: Duration,
    started_at: Instant,
}

/// The value a fade yields at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStep {
    /// Still running, currently at this value.
    Running(u8),
    /// Finished; the channel holds exactly the target.
    Done(u8),
}

impl FadeStep {
    /// The channel value for this step.
    #[must_use]
    pub const fn value(&self) -> u8 {
        match self {
            Self::Running(v) | Self::Done(v) => *v,
        }
    }
}

impl Fade {
    /// Creates a fade starting at `started_at`.
    #[must_use]
    pub const fn new(start_value: u8, target_value: u8, duration: Duration, started_at: Instant) -> Self {
        Self {
            start_value,
            target_value,
            duration,
            started_at,
        }
    }

    /// Interpolates the value at `now`.
    ///
    /// Progress is clamped to `[0, 1]`, so an instant before the start yields
    /// the start value. Once the duration has elapsed the exact target is
    /// returned rather than an interpolated value.
    #[must_use]
    pub fn sample(&self, now: Instant) -> FadeStep {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed >= self.duration {
            return FadeStep::Done(self.target_value);
        }

        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let start = f64::from(self.start_value);
        let delta = f64::from(self.target_value) - start;
        #[allow(clippy::cast_possible_truncation)]
        let value = (start + delta * progress).round() as i64;
        FadeStep::Running(clamp_u8(value))
    }

    /// Value the fade started from.
    #[must_use]
    pub const fn start_value(&self) -> u8 {
        self.start_value
    }

    /// Value the fade ends at.
    #[must_use]
    pub const fn target_value(&self) -> u8 {
        self.target_value
    }

    /// Total length of the fade.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// When the fade started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }
}
