// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The assembled gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bus::{DmxOutput, MemoryOutput, SharedOutput, shared};
use crate::color_temp::{ColorTempSource, CtConfig};
use crate::command::CommandExecutor;
use crate::config::GatewayConfig;
use crate::engine::{FadeScheduler, FrameTransmitter, PeriodicTask};
use crate::error::Error;
use crate::protocol::{CommandIntake, StatsSnapshot, UdpServer};
use crate::state::ChannelStore;

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    output: Option<Box<dyn DmxOutput>>,
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("config", &self.config)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

impl GatewayBuilder {
    /// Sets the bus output.
    ///
    /// Without one the gateway drives a [`MemoryOutput`].
    #[must_use]
    pub fn with_output(mut self, output: impl DmxOutput + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Validates the configuration and wires the components together.
    ///
    /// Nothing runs until [`Gateway::start`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn build(self) -> Result<Gateway, Error> {
        self.config.validate()?;

        let output = self.output.unwrap_or_else(|| {
            tracing::warn!("No DMX output configured, frames stay in memory");
            Box::new(MemoryOutput::new())
        });

        let store = Arc::new(ChannelStore::with_timeouts(self.config.store_timeouts()));
        let color_temp = Arc::new(RwLock::new(self.config.ct_config()));
        let source: Arc<dyn ColorTempSource> = color_temp.clone();
        let executor = CommandExecutor::new(Arc::clone(&store), source);
        let intake = CommandIntake::new(executor.clone(), self.config.network.max_udp_buffer_size);
        let server = UdpServer::new(self.config.bind_addr(), intake);

        Ok(Gateway {
            config: self.config,
            store,
            color_temp,
            executor,
            output: shared(output),
            server,
            fade_task: None,
            transmit_task: None,
        })
    }
}

/// A running (or ready to run) UDP-to-DMX gateway.
///
/// Owns the channel store, the two periodic tasks and the UDP server.
///
/// # Examples
///
/// ```no_run
/// use udp2dmx::config::GatewayConfig;
/// use udp2dmx::gateway::Gateway;
///
/// #[tokio::main]
/// async fn main() -> udp2dmx::Result<()> {
///     let mut gateway = Gateway::builder(GatewayConfig::default()).build()?;
///     let addr = gateway.start().await?;
///     println!("listening on {addr}");
///
///     tokio::signal::ctrl_c().await?;
///     gateway.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Gateway {
    config: GatewayConfig,
    store: Arc<ChannelStore>,
    color_temp: Arc<RwLock<CtConfig>>,
    executor: CommandExecutor,
    output: SharedOutput,
    server: UdpServer,
    fade_task: Option<PeriodicTask>,
    transmit_task: Option<PeriodicTask>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("server", &self.server)
            .field("fade_task", &self.fade_task)
            .field("transmit_task", &self.transmit_task)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Starts building a gateway from a configuration.
    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder { config, output: None }
    }

    /// Starts the periodic tasks and the UDP server.
    ///
    /// Returns the bound UDP address.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a task thread cannot be spawned or the socket
    /// cannot be bound. Tasks already started are stopped again.
    pub async fn start(&mut self) -> Result<SocketAddr, Error> {
        if self.fade_task.is_none() {
            let scheduler = FadeScheduler::new(Arc::clone(&self.store), Arc::clone(&self.output));
            self.fade_task = Some(scheduler.spawn(self.config.fade_interval())?);
        }
        if self.transmit_task.is_none() {
            let transmitter = FrameTransmitter::new(Arc::clone(&self.store), Arc::clone(&self.output));
            match transmitter.spawn(self.config.frame_interval()) {
                Ok(task) => self.transmit_task = Some(task),
                Err(e) => {
                    self.stop_tasks();
                    return Err(e.into());
                }
            }
        }

        match self.server.start().await {
            Ok(addr) => {
                tracing::info!(addr = %addr, "Gateway started");
                Ok(addr)
            }
            Err(e) => {
                self.stop_tasks();
                Err(e)
            }
        }
    }

    /// Stops the UDP server, then the fade scheduler, then the transmitter.
    pub async fn shutdown(&mut self) {
        self.server.stop().await;
        self.stop_tasks();
        tracing::info!("Gateway stopped");
    }

    fn stop_tasks(&mut self) {
        if let Some(mut task) = self.fade_task.take() {
            task.stop();
        }
        if let Some(mut task) = self.transmit_task.take() {
            task.stop();
        }
    }

    /// Returns whether the server and both tasks are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.server.is_running()
            && self.fade_task.as_ref().is_some_and(PeriodicTask::is_running)
            && self.transmit_task.as_ref().is_some_and(PeriodicTask::is_running)
    }

    /// Returns the bound UDP address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Returns the configuration the gateway was built from.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the channel store.
    #[must_use]
    pub const fn store(&self) -> &Arc<ChannelStore> {
        &self.store
    }

    /// Returns the command executor, for commands that do not arrive over UDP.
    #[must_use]
    pub const fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Copies the intake counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.server.stats()
    }

    /// Zeroes the intake counters.
    pub fn reset_stats(&self) {
        self.server.reset_stats();
    }

    /// Returns the current color-temperature configuration.
    #[must_use]
    pub fn color_temperature(&self) -> CtConfig {
        self.color_temp.read().clone()
    }

    /// Replaces the color-temperature configuration.
    ///
    /// Takes effect for the next `L` command.
    pub fn replace_color_temperature(&self, config: CtConfig) {
        *self.color_temp.write() = config;
        tracing::info!("Color temperature configuration replaced");
    }
}
