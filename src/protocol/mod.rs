// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDP command intake.
//!
//! Every datagram is one of:
//!
//! - a **full universe**: exactly 512 bytes, one per channel, channel 1 first
//! - a **text command**: more than 4 bytes, shorter than the receive buffer,
//!   starting with `DMX` (see [`crate::command`])
//! - anything else, which is counted as invalid and dropped
//!
//! Nothing is ever sent back to the sender.

mod stats;
mod udp;

pub use stats::{ServerStats, StatsSnapshot};
pub use udp::{CommandIntake, DEFAULT_BUFFER_SIZE, DEFAULT_UDP_PORT, Datagram, UdpServer};
