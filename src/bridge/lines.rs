//! Serial text relay.
//!
//! The microcontroller prints diagnostic text. Each complete line, or a
//! partial line followed by an idle gap, is broadcast to every client.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::Result;

const READ_CHUNK: usize = 256;

/// Longest line kept before it is emitted without a terminator.
pub const MAX_LINE_BYTES: usize = 1024;

/// Splits a byte stream into text lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes and returns every line they complete.
    ///
    /// Line terminators (`\n`, optionally preceded by `\r`) are stripped and
    /// empty lines are skipped. A line reaching [`MAX_LINE_BYTES`] is emitted
    /// as is and the rest continues on the next line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                if let Some(line) = self.take() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    if let Some(line) = self.take() {
                        lines.push(line);
                    }
                }
            }
        }
        lines
    }

    /// Emits the partial line, if any.
    pub fn flush(&mut self) -> Option<String> {
        self.take()
    }

    /// True when a partial line is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

fn publish(lines: &broadcast::Sender<String>, line: String) {
    debug!("Serial: {}", line);
    // No subscribers just means no client is connected.
    let _ = lines.send(line);
}

/// Reads device text until end of stream.
///
/// # Arguments
///
/// * `reader` - Read side of the serial port
/// * `idle_timeout` - Gap after which a partial line is emitted
/// * `lines` - Broadcast channel to the connected clients
///
/// # Errors
///
/// Returns `Io` if reading from the port fails.
pub async fn relay_serial_lines<R>(
    mut reader: R,
    idle_timeout: Duration,
    lines: broadcast::Sender<String>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut assembler = LineAssembler::new();
    let mut buffer = [0u8; READ_CHUNK];

    loop {
        let read = if assembler.has_pending() {
            match timeout(idle_timeout, reader.read(&mut buffer)).await {
                Ok(read) => read?,
                Err(_) => {
                    if let Some(line) = assembler.flush() {
                        publish(&lines, line);
                    }
                    continue;
                }
            }
        } else {
            reader.read(&mut buffer).await?
        };

        if read == 0 {
            if let Some(line) = assembler.flush() {
                publish(&lines, line);
            }
            info!("Serial stream closed");
            return Ok(());
        }

        for line in assembler.push(&buffer[..read]) {
            publish(&lines, line);
        }
    }
}
