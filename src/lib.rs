// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `udp2dmx` - a UDP to DMX-512 lighting gateway.
//!
//! The gateway keeps one 512-channel universe in memory, updates it from UDP
//! datagrams and streams it continuously to a DMX bus.
//!
//! # Datagram Formats
//!
//! - **Full universe**: exactly 512 bytes, slot values in channel order.
//!   Replaces the universe and cancels every fade.
//! - **Text command**: `DMX<type><channel>#<value>[#<speed>]`, for example
//!   `DMXR5#255128000#20`. See [`command`] for the command types.
//!
//! Anything else is counted as invalid and dropped. Nothing is acknowledged.
//!
//! # Architecture
//!
//! - [`state::ChannelStore`]: the universe plus per-channel fades, behind a
//!   lock with a bounded wait
//! - [`engine::FadeScheduler`]: advances fades every 10 ms and stages changed
//!   frames
//! - [`engine::FrameTransmitter`]: sends the current frame every 30 ms,
//!   keeping the bus refreshed
//! - [`protocol::UdpServer`]: receives datagrams and feeds the executor
//!
//! # Quick Start
//!
//! ```no_run
//! use udp2dmx::{Gateway, GatewayConfig, MemoryOutput};
//!
//! #[tokio::main]
//! async fn main() -> udp2dmx::Result<()> {
//!     let config = GatewayConfig::load("udp2dmx.json")?;
//!
//!     let output = MemoryOutput::new();
//!     let mut gateway = Gateway::builder(config).with_output(output.clone()).build()?;
//!     gateway.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     gateway.shutdown().await;
//!     println!("{} frames sent", output.frames_sent());
//!     Ok(())
//! }
//! ```
//!
//! # Executing Commands Directly
//!
//! ```
//! use udp2dmx::{Gateway, GatewayConfig, command::decode};
//!
//! let gateway = Gateway::builder(GatewayConfig::default()).build().unwrap();
//! gateway.executor().execute(&decode("DMXW10#255000").unwrap()).unwrap();
//!
//! assert_eq!(gateway.store().get(10).unwrap(), 255);
//! assert_eq!(gateway.store().get(11).unwrap(), 0);
//! ```

pub mod bus;
pub mod color_temp;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod state;
pub mod types;

pub use bus::{DmxOutput, MemoryOutput};
pub use color_temp::{ColorTempSource, CtConfig, CtRange};
pub use command::{Command, CommandExecutor, CommandType, decode};
pub use config::GatewayConfig;
pub use error::{BusError, CommandError, ConfigError, DecodeError, Error, LockTimeout, Result};
pub use gateway::{Gateway, GatewayBuilder};
pub use protocol::{StatsSnapshot, UdpServer};
pub use state::ChannelStore;
pub use types::{LightCt, RgbColor, SpeedCode, TunableWhite, UNIVERSE_SIZE, Universe};
