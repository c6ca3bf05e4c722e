//! # Link Protocol Constants and Types
//!
//! The JSON envelope streamed from the panel to the bridge, and the
//! constants of the serial frame the bridge forwards to the device.
//!
//! ## WebSocket Envelope
//!
//! ```json
//! { "servos": { "0": 130, "1": 64 }, "motors": { "0": 127 } }
//! ```
//!
//! Keys are actuator indices, values are rounded PWM values. The `motors`
//! key is omitted when there are no motors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default WebSocket host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 8765;

/// Serial frame start flag for servo values.
pub const SERVO_START_FLAG: u8 = 0x02;

/// Serial frame start flag for motor values.
pub const MOTOR_START_FLAG: u8 = 0x04;

/// Maximum number of body bytes (the length field is one byte).
pub const MAX_FRAME_BODY: usize = 255;

/// Frame overhead: flag(1) + length(1) + checksum(1).
pub const FRAME_OVERHEAD: usize = 3;

/// PWM values keyed by actuator index.
pub type PwmMap = BTreeMap<usize, u8>;

/// One frame's worth of rounded PWM values.
///
/// `BTreeMap` keeps entries in ascending index order, which is the order the
/// bridge writes them to the serial body.
///
/// # Examples
///
/// ```
/// use robot_arm_controller::link::protocol::PwmSnapshot;
///
/// let mut snapshot = PwmSnapshot::default();
/// snapshot.servos.insert(0, 130);
/// snapshot.servos.insert(1, 64);
/// assert_eq!(snapshot.to_json().unwrap(), r#"{"servos":{"0":130,"1":64}}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmSnapshot {
    /// Servo values.
    #[serde(default)]
    pub servos: PwmMap,

    /// Motor values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub motors: PwmMap,
}

impl PwmSnapshot {
    /// Serialises to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialisation fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope received over WebSocket.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed text, non-numeric keys or values outside
    /// 0-255.
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Servo values in ascending index order.
    pub fn servo_values(&self) -> Vec<u8> {
        self.servos.values().copied().collect()
    }

    /// Motor values in ascending index order.
    pub fn motor_values(&self) -> Vec<u8> {
        self.motors.values().copied().collect()
    }
}

/// A decoded serial frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialFrame {
    /// Start flag ([`SERVO_START_FLAG`] or [`MOTOR_START_FLAG`]).
    pub start_flag: u8,

    /// Body bytes (one PWM value per actuator).
    pub body: Vec<u8>,
}

impl SerialFrame {
    /// Create a new serial frame
    pub fn new(start_flag: u8, body: Vec<u8>) -> Self {
        Self { start_flag, body }
    }
}
