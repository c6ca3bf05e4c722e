//! # Serial Frame Decoder
//!
//! Decodes and validates serial frames. This is the receiving side of
//! [`encoder`](super::encoder), used to check what the bridge puts on the wire.

use super::checksum::verify_checksum;
use super::protocol::*;
use crate::error::{ArmControllerError, Result};

/// Decode a complete serial frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (flag, length, body, checksum)
///
/// # Returns
///
/// * `Result<SerialFrame>` - Decoded frame, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Start flag is unknown
/// - Length field does not match the frame size
/// - Checksum does not match
pub fn decode_frame(frame: &[u8]) -> Result<SerialFrame> {
    // Minimum frame size: flag(1) + length(1) + checksum(1) = 3 bytes
    if frame.len() < FRAME_OVERHEAD {
        return Err(ArmControllerError::Protocol("Frame too short".to_string()));
    }

    let start_flag = frame[0];
    if start_flag != SERVO_START_FLAG && start_flag != MOTOR_START_FLAG {
        return Err(ArmControllerError::Protocol(format!(
            "Unknown start flag: 0x{:02X}",
            start_flag
        )));
    }

    let length = frame[1] as usize;
    if frame.len() != length + FRAME_OVERHEAD {
        return Err(ArmControllerError::Protocol(format!(
            "Frame size mismatch: expected {} bytes, got {}",
            length + FRAME_OVERHEAD,
            frame.len()
        )));
    }

    let body = &frame[2..2 + length];
    let received = frame[2 + length];
    if !verify_checksum(body, received) {
        return Err(ArmControllerError::Protocol(format!(
            "Checksum mismatch: got 0x{:02X}",
            received
        )));
    }

    Ok(SerialFrame::new(start_flag, body.to_vec()))
}
