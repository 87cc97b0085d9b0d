// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scoped access to shared state with a bounded wait.

use std::time::Duration;

use parking_lot::Mutex;

use crate::error::LockTimeout;

/// A mutex whose every access is bounded by a timeout.
///
/// The lock is only reachable through [`Guarded::with`], which runs a closure
/// while holding it and releases it before returning. Guards never escape, so
/// no caller can hold two guarded resources at once by accident.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use udp2dmx::state::Guarded;
///
/// let counter = Guarded::new("counter", 0_u32);
/// let value = counter.with(Duration::from_millis(10), |n| {
///     *n += 1;
///     *n
/// });
/// assert_eq!(value, Ok(1));
/// ```
#[derive(Debug)]
pub struct Guarded<T> {
    inner: Mutex<T>,
    name: &'static str,
}

impl<T> Guarded<T> {
    /// Wraps a value under a resource name used in timeout errors.
    #[must_use]
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            name,
        }
    }

    /// Runs `f` with exclusive access, waiting at most `timeout` for the lock.
    ///
    /// # Errors
    ///
    /// Returns [`LockTimeout`] if the lock was not acquired in time. `f` is not
    /// called in that case.
    pub fn with<R>(&self, timeout: Duration, f: impl FnOnce(&mut T) -> R) -> Result<R, LockTimeout> {
        let Some(mut guard) = self.inner.try_lock_for(timeout) else {
            let err = LockTimeout {
                resource: self.name,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };
            tracing::warn!(resource = self.name, timeout_ms = err.timeout_ms, "Lock timeout");
            return Err(err);
        };
        Ok(f(&mut guard))
    }

    /// Returns the resource name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Consumes the wrapper and returns the value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
