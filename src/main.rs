//! # Robot Arm Controller
//!
//! Control panel for a gamepad-driven robot arm.
//!
//! Samples gamepads every frame, moves the bound servos and motors, and
//! streams their PWM values to the serial bridge over a WebSocket.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use robot_arm_controller::config::Config;
use robot_arm_controller::controller::evdev_pads::EvdevGamepads;
use robot_arm_controller::logging;
use robot_arm_controller::panel::{describe_error, CommandOutcome, Panel};
use robot_arm_controller::transport::ServerConnection;

/// Number of frames between status log messages
const STATUS_INTERVAL_FRAMES: u64 = 3600;

/// Frame period for a display rate.
fn frame_period(frame_rate_hz: u32) -> Duration {
    Duration::from_millis(u64::from(1000 / frame_rate_hz.max(1)))
}

/// Main entry point for the control panel
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml` if present)
///    - Set up logging
///    - Start the gamepad scanner and the bridge connection
///    - Optionally load the save file and connect
///
/// 2. **Main Loop**
///    - Run one panel frame per tick
///    - Execute console commands between frames
///    - Feed connection events into the panel
///
/// 3. **Shutdown** on `quit` or Ctrl+C
///
/// # Examples
///
/// ```bash
/// cargo run --release --bin robot-arm-controller -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load_or_default(config_path.as_deref())?;
    let _log_guard = logging::init(&config.logging);

    info!("Robot Arm Controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let gamepads = EvdevGamepads::new(
        &config.controller.device_dir,
        Duration::from_millis(config.controller.rescan_interval_ms),
    );
    let (connection, mut connection_events) = ServerConnection::logging();
    let mut panel = Panel::new(gamepads, connection, &config);

    if config.persistence.load_on_start {
        if let Err(e) = panel.load(None) {
            error!(target: "operator", "{}", describe_error(&e));
        }
    }
    if config.server.auto_connect {
        panel.connect(None, None);
    }

    let period = frame_period(config.controller.frame_rate_hz);
    let mut frames = interval(period);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    info!("Running at {}Hz, type 'help' for commands", config.controller.frame_rate_hz);

    let mut frame_count: u64 = 0;

    loop {
        tokio::select! {
            _ = frames.tick() => {
                panel.tick(Instant::now());
                frame_count += 1;

                if frame_count % STATUS_INTERVAL_FRAMES == 0 {
                    debug!(
                        "{} frames, {} servos, {} motors, connection {}",
                        frame_count,
                        panel.servos().len(),
                        panel.motors().len(),
                        panel.connection().state()
                    );
                }
            }

            line = console.next_line(), if console_open => {
                match line {
                    Ok(Some(line)) => match panel.execute_line(&line) {
                        Ok(CommandOutcome::Done) => {}
                        Ok(CommandOutcome::Output(text)) => println!("{}", text),
                        Ok(CommandOutcome::Quit) => {
                            info!("Quit requested, shutting down...");
                            break;
                        }
                        Err(e) => error!(target: "operator", "{}", describe_error(&e)),
                    },
                    Ok(None) => {
                        debug!("Console closed");
                        console_open = false;
                    }
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        console_open = false;
                    }
                }
            }

            Some(event) = connection_events.recv() => {
                panel.handle_connection_event(event);
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total frames: {}", frame_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_period_calculation() {
        assert_eq!(frame_period(60), Duration::from_millis(16));
        assert_eq!(frame_period(50), Duration::from_millis(20));
        assert_eq!(frame_period(1000), Duration::from_millis(1));
    }

    #[test]
    fn test_frame_period_zero_rate() {
        assert_eq!(frame_period(0), Duration::from_secs(1));
    }

    #[test]
    fn test_status_interval_constant() {
        // At 60Hz, 3600 frames = 1 minute
        assert_eq!(STATUS_INTERVAL_FRAMES / 60, 60);
    }
}
