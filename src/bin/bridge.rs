//! # Robot Arm Bridge
//!
//! Receives PWM envelopes over WebSocket and writes them to the arm's
//! microcontroller as serial frames. Text printed by the microcontroller is
//! relayed back to every connected client.
//!
//! ```bash
//! cargo run --release --bin robot-arm-bridge -- config/default.toml /dev/ttyUSB0
//! ```
//!
//! The optional second argument overrides `bridge.serial_port`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use robot_arm_controller::bridge::{run_bridge, BridgeSettings};
use robot_arm_controller::config::Config;
use robot_arm_controller::logging;
use robot_arm_controller::serial::ArmSerial;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let serial_override = args.next();

    let config = Config::load_or_default(config_path.as_deref())?;
    let _log_guard = logging::init(&config.logging);

    info!("Robot Arm Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let bridge = &config.bridge;
    let serial_path = serial_override.as_deref().unwrap_or(&bridge.serial_port);
    let serial = ArmSerial::open(serial_path, bridge.baud_rate)?;
    info!("Serial port opened at: {}", serial.device_path());
    let (reader, writer) = serial.into_split();

    let address = format!("{}:{}", bridge.listen_host, bridge.listen_port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to listen on {}", address))?;

    info!(
        "Forwarding at most {} messages/s per client (motors {})",
        bridge.messages_per_second,
        if bridge.forward_motors { "on" } else { "off" }
    );
    info!("Press Ctrl+C to exit");

    tokio::select! {
        result = run_bridge(listener, writer, reader, BridgeSettings::from(bridge)) => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
    }

    Ok(())
}
