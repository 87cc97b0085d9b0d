// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDP receive loop and datagram routing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::command::{COMMAND_MARKER, CommandExecutor, decode};
use crate::error::{CommandError, DecodeError, Error};
use crate::types::{UNIVERSE_SIZE, Universe};

use super::{ServerStats, StatsSnapshot};

/// Default listening port.
pub const DEFAULT_UDP_PORT: u16 = 6454;

/// Default receive buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Texts this short cannot hold a command.
const MIN_TEXT_LEN: usize = 4;

// ========== Classification ==========

/// What a datagram turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datagram<'a> {
    /// Exactly one universe of channel values.
    Universe(&'a Universe),
    /// A text command, not yet decoded.
    Text(&'a [u8]),
    /// Neither of the above.
    Invalid,
}

impl<'a> Datagram<'a> {
    /// Classifies a datagram received into a buffer of `buffer_size` bytes.
    ///
    /// A text datagram that fills the whole buffer may have been truncated
    /// and is treated as invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use udp2dmx::protocol::Datagram;
    ///
    /// assert!(matches!(Datagram::classify(b"DMXC1#255", 1024), Datagram::Text(_)));
    /// assert!(matches!(Datagram::classify(&[0; 512], 1024), Datagram::Universe(_)));
    /// assert_eq!(Datagram::classify(b"DMXC", 1024), Datagram::Invalid);
    /// ```
    #[must_use]
    pub fn classify(data: &'a [u8], buffer_size: usize) -> Self {
        if let Ok(frame) = <&Universe>::try_from(data) {
            return Self::Universe(frame);
        }
        let len = data.len();
        if len > MIN_TEXT_LEN && len < buffer_size && data.starts_with(COMMAND_MARKER.as_bytes()) {
            Self::Text(data)
        } else {
            Self::Invalid
        }
    }
}

// ========== Intake ==========

/// Routes datagrams to the store or the command executor.
///
/// This is the synchronous core of the server; it owns no socket, so it can
/// be driven directly from tests.
#[derive(Debug)]
pub struct CommandIntake {
    executor: CommandExecutor,
    stats: ServerStats,
    buffer_size: usize,
}

impl CommandIntake {
    /// Creates an intake for datagrams of at most `buffer_size` bytes.
    #[must_use]
    pub fn new(executor: CommandExecutor, buffer_size: usize) -> Self {
        Self {
            executor,
            stats: ServerStats::new(),
            buffer_size,
        }
    }

    /// Returns the receive buffer size.
    #[must_use]
    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the live counters.
    #[must_use]
    pub const fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Returns the executor used for text commands.
    #[must_use]
    pub const fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Handles one datagram.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidPacket` if the datagram is neither a universe nor text
    /// - `Error::Decode` if the text is not a valid command
    /// - `Error::Command` if the command or universe cannot be applied
    pub fn handle_datagram(&self, data: &[u8]) -> Result<(), Error> {
        self.handle_datagram_at(data, Instant::now())
    }

    /// Like [`CommandIntake::handle_datagram`], with an explicit fade start.
    ///
    /// # Errors
    ///
    /// Same as [`CommandIntake::handle_datagram`].
    pub fn handle_datagram_at(&self, data: &[u8], now: Instant) -> Result<(), Error> {
        self.stats.record_received();
        match Datagram::classify(data, self.buffer_size) {
            Datagram::Universe(frame) => match self.executor.store().bulk_replace(frame) {
                Ok(()) => {
                    self.stats.record_universe();
                    Ok(())
                }
                Err(e) => {
                    self.stats.record_invalid();
                    Err(CommandError::from(e).into())
                }
            },
            Datagram::Text(bytes) => {
                let result = self.run_text(bytes, now);
                if result.is_ok() {
                    self.stats.record_command();
                } else {
                    self.stats.record_command_error();
                }
                result
            }
            Datagram::Invalid => {
                self.stats.record_invalid();
                Err(Error::InvalidPacket { len: data.len() })
            }
        }
    }

    fn run_text(&self, bytes: &[u8], now: Instant) -> Result<(), Error> {
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
        tracing::debug!(text = %text.trim_end(), "Text command received");
        let command = decode(text)?;
        self.executor.execute_at(&command, now)?;
        Ok(())
    }
}

// ========== Server ==========

#[derive(Debug)]
struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The UDP listener feeding a [`CommandIntake`].
///
/// The receive loop runs as a tokio task. Datagrams are handled one at a time
/// in arrival order. Handling takes the channel store lock, which may wait up
/// to the store's write timeout, so each datagram runs on tokio's blocking
/// pool and the loop awaits it before reading the next one. Other tasks on the
/// runtime keep running meanwhile, even on a `current_thread` runtime.
///
/// Stopping the server ends the task once the datagram in hand is done,
/// which closes the socket. Dropping the server has the same effect.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use udp2dmx::color_temp::CtConfig;
/// use udp2dmx::command::CommandExecutor;
/// use udp2dmx::protocol::{CommandIntake, UdpServer};
/// use udp2dmx::state::ChannelStore;
///
/// #[tokio::main]
/// async fn main() -> udp2dmx::Result<()> {
///     let executor = CommandExecutor::new(Arc::new(ChannelStore::new()), Arc::new(CtConfig::default()));
///     let mut server = UdpServer::new("0.0.0.0:6454".parse().unwrap(), CommandIntake::new(executor, 1024));
///
///     let addr = server.start().await?;
///     println!("listening on {addr}");
///     server.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct UdpServer {
    bind_addr: SocketAddr,
    intake: Arc<CommandIntake>,
    running: Option<Running>,
}

impl UdpServer {
    /// Creates a stopped server that will listen on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, intake: CommandIntake) -> Self {
        Self {
            bind_addr,
            intake: Arc::new(intake),
            running: None,
        }
    }

    /// Binds the socket and starts the receive loop.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested. Starting a running server returns its address.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the socket cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, Error> {
        if let Some(running) = &self.running
            && !running.task.is_finished()
        {
            tracing::warn!(addr = %running.local_addr, "UDP server already running");
            return Ok(running.local_addr);
        }

        let socket = UdpSocket::bind(self.bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(receive_loop(socket, Arc::clone(&self.intake), shutdown_rx));

        tracing::info!(
            addr = %local_addr,
            buffer_size = self.intake.buffer_size(),
            "UDP server listening"
        );
        self.running = Some(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stops the receive loop and closes the socket.
    ///
    /// Does nothing when the server is not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            tracing::error!(error = %e, "UDP receive task failed");
        }
        tracing::info!(addr = %running.local_addr, "UDP server stopped");
    }

    /// Stops and starts the server again.
    ///
    /// # Errors
    ///
    /// Same as [`UdpServer::start`].
    pub async fn restart(&mut self) -> Result<SocketAddr, Error> {
        self.stop().await;
        self.start().await
    }

    /// Returns whether the receive loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Returns the bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Returns the intake behind this server.
    #[must_use]
    pub fn intake(&self) -> &CommandIntake {
        &self.intake
    }

    /// Copies the intake counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.intake.stats().snapshot()
    }

    /// Zeroes the intake counters.
    pub fn reset_stats(&self) {
        self.intake.stats().reset();
    }
}

async fn receive_loop(socket: UdpSocket, intake: Arc<CommandIntake>, mut shutdown: oneshot::Receiver<()>) {
    let mut buffer = vec![0_u8; intake.buffer_size().max(UNIVERSE_SIZE + 1)];
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            received = socket.recv_from(&mut buffer) => match received {
                Ok((len, peer)) => {
                    tracing::trace!(%peer, len, "Datagram received");
                    let data = buffer[..len].to_vec();
                    let worker = Arc::clone(&intake);
                    match tokio::task::spawn_blocking(move || worker.handle_datagram(&data)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!(%peer, len, error = %e, "Datagram dropped"),
                        Err(e) => tracing::error!(%peer, len, error = %e, "Datagram handler failed"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "UDP receive failed"),
            },
        }
    }
    tracing::debug!("UDP receive loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_temp::CtConfig;
    use crate::state::ChannelStore;

    fn intake() -> CommandIntake {
        let executor = CommandExecutor::new(Arc::new(ChannelStore::new()), Arc::new(CtConfig::default()));
        CommandIntake::new(executor, DEFAULT_BUFFER_SIZE)
    }

    #[test]
    fn classify_lengths() {
        assert_eq!(Datagram::classify(b"", 1024), Datagram::Invalid);
        assert_eq!(Datagram::classify(b"DMXC", 1024), Datagram::Invalid);
        assert!(matches!(Datagram::classify(b"DMXC1", 1024), Datagram::Text(_)));
        assert_eq!(Datagram::classify(b"HELLO", 1024), Datagram::Invalid);
        assert_eq!(Datagram::classify(&[0; 511], 1024), Datagram::Invalid);
        assert_eq!(Datagram::classify(&[0; 513], 1024), Datagram::Invalid);
    }

    #[test]
    fn universe_wins_over_text_prefix() {
        let mut frame = [0_u8; UNIVERSE_SIZE];
        frame[..3].copy_from_slice(b"DMX");
        assert!(matches!(Datagram::classify(&frame, 1024), Datagram::Universe(_)));
    }

    #[test]
    fn text_filling_buffer_is_invalid() {
        let mut text = b"DMXC1#".to_vec();
        text.resize(600, b'1');
        assert_eq!(Datagram::classify(&text, 600), Datagram::Invalid);
        assert!(matches!(Datagram::classify(&text, 601), Datagram::Text(_)));
    }

    #[test]
    fn text_command_updates_store_and_stats() {
        let intake = intake();
        intake.handle_datagram(b"DMXC12#200").unwrap();
        assert_eq!(intake.executor().store().get(12).unwrap(), 200);

        let stats = intake.stats().snapshot();
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.packets_processed, 1);
        assert_eq!(stats.commands_executed, 1);
    }

    #[test]
    fn universe_replaces_everything() {
        let intake = intake();
        intake.handle_datagram(b"DMXC1#9#50").unwrap();

        let frame = [7_u8; UNIVERSE_SIZE];
        intake.handle_datagram(&frame).unwrap();
        let store = intake.executor().store();
        assert_eq!(store.snapshot().unwrap(), frame);
        assert_eq!(store.active_fades().unwrap(), 0);
        assert_eq!(intake.stats().snapshot().universe_updates, 1);
    }

    #[test]
    fn failures_are_counted() {
        let intake = intake();
        assert!(matches!(
            intake.handle_datagram(b"xyz"),
            Err(Error::InvalidPacket { len: 3 })
        ));
        assert!(matches!(
            intake.handle_datagram(b"DMXQ1#2"),
            Err(Error::Decode(DecodeError::UnknownType('Q')))
        ));
        assert!(matches!(
            intake.handle_datagram(b"DMXC0#2"),
            Err(Error::Command(CommandError::InvalidChannel { channel: 0, width: 1 }))
        ));
        assert!(matches!(
            intake.handle_datagram(b"DMXC1#\xff"),
            Err(Error::Decode(DecodeError::NotUtf8))
        ));

        let stats = intake.stats().snapshot();
        assert_eq!(stats.packets_received, 4);
        assert_eq!(stats.packets_invalid, 4);
        assert_eq!(stats.command_errors, 3);
        assert_eq!(stats.packets_processed, 0);
    }
}
