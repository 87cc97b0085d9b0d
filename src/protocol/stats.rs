// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intake counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters updated by the intake task.
#[derive(Debug, Default)]
pub struct ServerStats {
    packets_received: AtomicU64,
    packets_processed: AtomicU64,
    packets_invalid: AtomicU64,
    commands_executed: AtomicU64,
    command_errors: AtomicU64,
    universe_updates: AtomicU64,
}

/// A point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Datagrams read from the socket.
    pub packets_received: u64,
    /// Datagrams that changed the universe.
    pub packets_processed: u64,
    /// Datagrams dropped for any reason.
    pub packets_invalid: u64,
    /// Text commands applied.
    pub commands_executed: u64,
    /// Text commands that failed to decode or execute.
    pub command_errors: u64,
    /// Full-universe packets applied.
    pub universe_updates: u64,
}

impl ServerStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_processed: self.packets_processed.load(Ordering::Relaxed),
            packets_invalid: self.packets_invalid.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            command_errors: self.command_errors.load(Ordering::Relaxed),
            universe_updates: self.universe_updates.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_universe(&self) {
        self.packets_processed.fetch_add(1, Ordering::Relaxed);
        self.universe_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_command(&self) {
        self.packets_processed.fetch_add(1, Ordering::Relaxed);
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_command_error(&self) {
        self.packets_invalid.fetch_add(1, Ordering::Relaxed);
        self.command_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid(&self) {
        self.packets_invalid.fetch_add(1, Ordering::Relaxed);
    }

    fn counters(&self) -> [&AtomicU64; 6] {
        [
            &self.packets_received,
            &self.packets_processed,
            &self.packets_invalid,
            &self.commands_executed,
            &self.command_errors,
            &self.universe_updates,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_resets() {
        let stats = ServerStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_command();
        stats.record_command_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.packets_processed, 1);
        assert_eq!(snapshot.packets_invalid, 1);
        assert_eq!(snapshot.commands_executed, 1);
        assert_eq!(snapshot.command_errors, 1);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot_serializes_flat() {
        let stats = ServerStats::new();
        stats.record_universe();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["universe_updates"], 1);
        assert_eq!(json["packets_processed"], 1);
        assert_eq!(json["packets_invalid"], 0);
    }
}
