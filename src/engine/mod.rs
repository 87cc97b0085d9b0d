// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic tasks that keep the bus alive.
//!
//! Two tasks run next to the network intake, each on its own named thread:
//!
//! - [`FadeScheduler`] advances running fades (default every 10 ms) and
//!   stages a new frame when a value moved
//! - [`FrameTransmitter`] sends the current universe (default every 30 ms)
//!   whether or not anything changed, as DMX receivers expect
//!
//! Both are plain structs with a `tick` method, so tests can drive them with
//! synthetic instants; `spawn` wraps them in a [`PeriodicTask`].

mod fade_scheduler;
mod transmitter;

pub use fade_scheduler::{DEFAULT_FADE_INTERVAL, FadeScheduler};
pub use transmitter::{DEFAULT_FRAME_INTERVAL, FrameTransmitter};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shortest period a task accepts.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A closure called at a fixed period on a dedicated thread.
///
/// Ticks are scheduled against deadlines, not sleeps, so the period does not
/// drift with the tick's own run time. When a tick overruns, missed deadlines
/// are skipped rather than replayed in a burst.
///
/// The thread stops on [`PeriodicTask::stop`] or when the task is dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use udp2dmx::engine::PeriodicTask;
///
/// let ticks = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&ticks);
/// let mut task = PeriodicTask::spawn("counter", Duration::from_millis(1), move |_| {
///     counter.fetch_add(1, Ordering::Relaxed);
/// })
/// .unwrap();
///
/// std::thread::sleep(Duration::from_millis(20));
/// task.stop();
/// assert!(ticks.load(Ordering::Relaxed) > 0);
/// assert!(!task.is_running());
/// ```
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Starts a thread named `name` calling `tick` every `period`.
    ///
    /// `tick` receives the instant the tick started. Periods under 1 ms are
    /// raised to 1 ms.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            tracing::debug!(
                task = name,
                period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
                "Periodic task started"
            );
            let mut deadline = Instant::now() + period;
            while flag.load(Ordering::Acquire) {
                let now = Instant::now();
                if now < deadline {
                    thread::park_timeout(deadline - now);
                    continue;
                }
                tick(now);
                deadline += period;
                let finished = Instant::now();
                if deadline <= finished {
                    tracing::trace!(task = name, "Tick overran, skipping missed deadlines");
                    deadline = finished + period;
                }
            }
            tracing::debug!(task = name, "Periodic task stopped");
        })?;

        Ok(Self {
            name,
            running,
            handle: Some(handle),
        })
    }

    /// Returns the thread name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns whether the thread is still ticking.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the thread and waits for the current tick to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::error!(task = self.name, "Periodic task panicked");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
