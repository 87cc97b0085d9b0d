// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fade interpolation task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bus::SharedOutput;
use crate::engine::PeriodicTask;
use crate::error::BusError;
use crate::state::{ChannelStore, FadeTick};

/// Default tick period.
pub const DEFAULT_FADE_INTERVAL: Duration = Duration::from_millis(10);

/// Advances fades and stages changed frames on the bus output.
#[derive(Clone)]
pub struct FadeScheduler {
    store: Arc<ChannelStore>,
    output: SharedOutput,
}

impl std::fmt::Debug for FadeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeScheduler").finish_non_exhaustive()
    }
}

impl FadeScheduler {
    /// Creates a scheduler over `store` feeding `output`.
    #[must_use]
    pub fn new(store: Arc<ChannelStore>, output: SharedOutput) -> Self {
        Self { store, output }
    }

    /// Runs one tick at `now`.
    ///
    /// The store lock is taken once. The output is only touched when a
    /// channel value actually moved.
    ///
    /// # Errors
    ///
    /// Returns `BusError::LockTimeout` if the store or the output is busy, or
    /// the output's own error if staging the frame fails.
    pub fn tick(&self, now: Instant) -> Result<FadeTick, BusError> {
        let tick = self.store.advance_fades(now)?;
        if let Some(frame) = tick.frame {
            let timeout = self.store.timeouts().write;
            self.output.with(timeout, |out| out.write_frame(&frame))??;
            tracing::trace!(active = tick.active, "Fade frame staged");
        }
        Ok(tick)
    }

    /// Starts ticking every `period` on a thread named `fade-scheduler`.
    ///
    /// Failed ticks are logged and the loop carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self, period: Duration) -> std::io::Result<PeriodicTask> {
        PeriodicTask::spawn("fade-scheduler", period, move |now| {
            if let Err(e) = self.tick(now) {
                tracing::warn!(error = %e, "Fade tick failed");
            }
        })
    }
}
