//! # Serial Bridge
//!
//! WebSocket server that forwards PWM envelopes to the microcontroller.
//!
//! This module handles:
//! - Accepting WebSocket clients
//! - Rate limiting and encoding envelopes per client
//! - Writing frames to the serial port from a single writer task
//! - Relaying serial text back to every client
//!
//! ## Flow
//!
//! ```text
//! client ──ws text──▶ ClientSession ──frames──▶ mpsc ──▶ serial writer
//! client ◀──ws text── broadcast ◀── relay_serial_lines ◀── serial reader
//! ```

pub mod lines;
pub mod session;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{ArmControllerError, Result};
use crate::serial::port_trait::SerialPortIO;
use crate::serial::send_frame;
use lines::relay_serial_lines;
use session::ClientSession;

/// Frames waiting for the serial writer.
const FRAME_QUEUE_DEPTH: usize = 64;

/// Serial lines buffered per client before the slowest one starts missing text.
const LINE_QUEUE_DEPTH: usize = 128;

/// Bridge settings taken from the `[bridge]` config section.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub messages_per_second: u32,
    pub forward_motors: bool,
    pub serial_idle_timeout: Duration,
}

impl From<&BridgeConfig> for BridgeSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            messages_per_second: config.messages_per_second,
            forward_motors: config.forward_motors,
            serial_idle_timeout: Duration::from_millis(config.serial_idle_timeout_ms),
        }
    }
}

/// Writes queued frames until every sender is gone.
///
/// A failed write is logged and the frame dropped; the next frame is tried
/// normally.
pub async fn run_serial_writer<P: SerialPortIO>(mut port: P, mut frames: mpsc::Receiver<Bytes>) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = send_frame(&mut port, &frame).await {
            warn!("Dropping frame: {}", e);
        }
    }
    debug!("Serial writer stopped");
}

/// Serves one WebSocket client until it disconnects.
///
/// # Arguments
///
/// * `stream` - Accepted TCP stream (or any byte stream in tests)
/// * `peer` - Remote address for logging
/// * `frames` - Queue to the serial writer
/// * `lines` - Serial text subscription
/// * `settings` - Rate and motor forwarding settings
///
/// # Errors
///
/// Returns `Protocol` if the WebSocket handshake fails.
pub async fn serve_client<S>(
    stream: S,
    peer: SocketAddr,
    frames: mpsc::Sender<Bytes>,
    mut lines: broadcast::Receiver<String>,
    settings: BridgeSettings,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let socket = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| ArmControllerError::Protocol(format!("Handshake with {} failed: {}", peer, e)))?;
    info!("Client connected: {}", peer);

    let (mut outbound, mut inbound) = socket.split();
    let mut session = ClientSession::new(
        settings.messages_per_second,
        settings.forward_motors,
        Instant::now(),
    );
    let mut relay_open = true;

    loop {
        tokio::select! {
            message = inbound.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        for frame in session.handle_text(&text, Instant::now()) {
                            if frames.send(frame).await.is_err() {
                                warn!("Serial writer is gone, closing {}", peer);
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(other)) => debug!("Ignoring non-text message from {}: {:?}", peer, other),
                    Some(Err(e)) => {
                        warn!("Connection to {} failed: {}", peer, e);
                        break;
                    }
                }
            }
            line = lines.recv(), if relay_open => {
                match line {
                    Ok(line) => {
                        if let Err(e) = outbound.send(Message::Text(line)).await {
                            warn!("Failed to relay serial text to {}: {}", peer, e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("{} missed {} serial lines", peer, missed);
                    }
                    // Serial reader ended; keep forwarding frames.
                    Err(broadcast::error::RecvError::Closed) => relay_open = false,
                }
            }
        }
    }

    info!(
        "Client disconnected: {} ({} forwarded, {} rate limited)",
        peer,
        session.forwarded(),
        session.dropped()
    );
    Ok(())
}

/// Runs the bridge: serial writer, serial reader and the accept loop.
///
/// Never returns under normal operation; the caller stops it by dropping the
/// future (for example from `tokio::select!` on Ctrl+C).
///
/// # Errors
///
/// Returns `Io` if accepting a connection fails.
pub async fn run_bridge<P, R>(
    listener: TcpListener,
    writer: P,
    reader: R,
    settings: BridgeSettings,
) -> Result<()>
where
    P: SerialPortIO + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
    let (line_tx, _) = broadcast::channel(LINE_QUEUE_DEPTH);

    tokio::spawn(run_serial_writer(writer, frame_rx));

    let relay_tx = line_tx.clone();
    let idle_timeout = settings.serial_idle_timeout;
    tokio::spawn(async move {
        if let Err(e) = relay_serial_lines(reader, idle_timeout, relay_tx).await {
            error!("Serial reader stopped: {}", e);
        }
    });

    if let Ok(addr) = listener.local_addr() {
        info!("Bridge listening on ws://{}", addr);
    }

    loop {
        let (stream, peer) = listener.accept().await?;
        let frames = frame_tx.clone();
        let lines = line_tx.subscribe();
        let settings = settings.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, peer, frames, lines, settings).await {
                warn!("{}", e);
            }
        });
    }
}
