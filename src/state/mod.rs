// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared channel state.
//!
//! The [`ChannelStore`] owns the universe buffer and the fade table. The
//! network intake, the fade scheduler and the frame transmitter all reach it
//! through the same [`Guarded`] lock, each access bounded by a timeout.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use udp2dmx::state::ChannelStore;
//!
//! let store = ChannelStore::new();
//! let t0 = Instant::now();
//! store.start_fade_at(1, 200, Duration::from_millis(100), t0).unwrap();
//!
//! let tick = store.advance_fades(t0 + Duration::from_millis(50)).unwrap();
//! assert!(tick.changed);
//! assert_eq!(store.get(1).unwrap(), 100);
//! ```

mod channel_store;
mod fade;
mod guarded;

pub use channel_store::{ChannelStore, FadeTick, StoreTimeouts};
pub use fade::{Fade, FadeStep};
pub use guarded::Guarded;
