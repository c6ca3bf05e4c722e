//! # Client Session
//!
//! Per-connection message handling: rate limiting and turning envelopes into
//! serial frames.
//!
//! The panel sends one envelope per display frame, usually faster than the
//! serial line or the servos can follow. Each connection forwards at most
//! `messages_per_second` envelopes; the rest are dropped, not queued.

use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::link::encoder::encode_snapshot_frames;
use crate::link::protocol::PwmSnapshot;

/// Minimum spacing between forwarded messages.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Instant,
}

impl RateLimiter {
    /// Creates a limiter whose first reference point is `start`.
    ///
    /// # Arguments
    ///
    /// * `messages_per_second` - Maximum forwarding rate (0 is treated as 1)
    /// * `start` - Connection time
    pub fn new(messages_per_second: u32, start: Instant) -> Self {
        Self {
            min_interval: Duration::from_secs(1) / messages_per_second.max(1),
            last: start,
        }
    }

    /// Minimum spacing between forwarded messages.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// True when enough time has passed since the last forwarded message.
    pub fn ready(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.min_interval
    }

    /// Records a forwarded message.
    pub fn mark(&mut self, now: Instant) {
        self.last = now;
    }
}

/// State of one WebSocket client.
#[derive(Debug, Clone)]
pub struct ClientSession {
    limiter: RateLimiter,
    forward_motors: bool,
    forwarded: u64,
    dropped: u64,
}

impl ClientSession {
    /// Starts a session at connection time `start`.
    pub fn new(messages_per_second: u32, forward_motors: bool, start: Instant) -> Self {
        Self {
            limiter: RateLimiter::new(messages_per_second, start),
            forward_motors,
            forwarded: 0,
            dropped: 0,
        }
    }

    /// Handles one text message and returns the frames to write.
    ///
    /// Returns no frames when the message comes too soon after the previous
    /// forwarded one, is malformed, or carries no values to forward.
    pub fn handle_text(&mut self, text: &str, now: Instant) -> Vec<Bytes> {
        if !self.limiter.ready(now) {
            self.dropped += 1;
            return Vec::new();
        }

        let snapshot = match PwmSnapshot::from_json(text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping malformed message: {}", e);
                return Vec::new();
            }
        };

        let frames = match encode_snapshot_frames(&snapshot, self.forward_motors) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Skipping message: {}", e);
                return Vec::new();
            }
        };

        if frames.is_empty() {
            debug!("Message has no values to forward");
            return frames;
        }

        self.limiter.mark(now);
        self.forwarded += 1;
        frames
    }

    /// Messages turned into frames so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Messages dropped by the rate limit so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
