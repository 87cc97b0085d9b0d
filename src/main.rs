// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `udp2dmx` command-line gateway.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::{Instant, interval_at};
use tracing_subscriber::EnvFilter;

use udp2dmx::bus::{DmxOutput, MemoryOutput};
use udp2dmx::{Gateway, GatewayConfig};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP port, overriding the configuration.
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind, overriding the configuration.
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Serial device of the DMX adapter, overriding the configuration.
    #[arg(short, long)]
    serial_port: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> udp2dmx::Result<GatewayConfig> {
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => {
            tracing::info!("No configuration file given, using defaults");
            GatewayConfig::default()
        }
    };
    if let Some(port) = args.port {
        config = config.with_udp_port(port);
    }
    if let Some(address) = args.bind {
        config = config.with_bind_address(address);
    }
    if let Some(device) = &args.serial_port {
        config = config.with_serial_port(device.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_output(config: &GatewayConfig) -> udp2dmx::Result<Box<dyn DmxOutput>> {
    match config.dmx.serial_port.as_deref() {
        #[cfg(feature = "serial")]
        Some(device) => Ok(Box::new(udp2dmx::bus::SerialDmxOutput::open(device)?)),
        #[cfg(not(feature = "serial"))]
        Some(device) => {
            tracing::warn!(device, "Built without serial support, frames stay in memory");
            Ok(Box::new(MemoryOutput::new()))
        }
        None => {
            tracing::warn!("No serial port configured, frames stay in memory");
            Ok(Box::new(MemoryOutput::new()))
        }
    }
}

#[tokio::main]
async fn main() -> udp2dmx::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with_target(false)
        .with_thread_names(true)
        .init();

    let config = load_config(&args)?;
    config.log_summary();

    let output = open_output(&config)?;
    let mut gateway = Gateway::builder(config).with_output(output).build()?;
    let addr = gateway.start().await?;
    tracing::info!(addr = %addr, "udp2dmx ready, press Ctrl+C to stop");

    let mut stats_timer = interval_at(Instant::now() + STATS_INTERVAL, STATS_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = stats_timer.tick() => {
                let stats = gateway.stats();
                tracing::info!(
                    received = stats.packets_received,
                    processed = stats.packets_processed,
                    invalid = stats.packets_invalid,
                    commands = stats.commands_executed,
                    command_errors = stats.command_errors,
                    universes = stats.universe_updates,
                    "Gateway statistics"
                );
            }
        }
    }

    gateway.shutdown().await;
    Ok(())
}
