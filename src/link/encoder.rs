//! # Serial Frame Encoder
//!
//! Encodes PWM values into serial frames for the microcontroller.
//!
//! ## Frame Layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | Start flag (0x02 servos, 0x04 motors) |
//! | 1 | Body length N |
//! | 2..2+N | Body (one PWM value per actuator) |
//! | 2+N | Checksum (sum of body mod 256) |

use bytes::{BufMut, Bytes, BytesMut};

use super::checksum::body_checksum;
use super::protocol::*;
use crate::error::{ArmControllerError, Result};

/// Encode a body into a complete serial frame
///
/// # Arguments
///
/// * `start_flag` - Frame type flag
/// * `body` - PWM values, at most 255 bytes
///
/// # Returns
///
/// * `Result<Bytes>` - Complete frame (body length + 3 bytes)
///
/// # Errors
///
/// Returns `Protocol` if the body does not fit the one-byte length field.
///
/// # Examples
///
/// ```
/// use robot_arm_controller::link::encoder::encode_frame;
/// use robot_arm_controller::link::protocol::SERVO_START_FLAG;
///
/// let frame = encode_frame(SERVO_START_FLAG, &[130, 64]).unwrap();
/// assert_eq!(&frame[..], &[0x02, 2, 130, 64, 194]);
/// ```
pub fn encode_frame(start_flag: u8, body: &[u8]) -> Result<Bytes> {
    if body.len() > MAX_FRAME_BODY {
        return Err(ArmControllerError::Protocol(format!(
            "Frame body too long: {} bytes (max {})",
            body.len(),
            MAX_FRAME_BODY
        )));
    }

    let mut frame = BytesMut::with_capacity(body.len() + FRAME_OVERHEAD);
    frame.put_u8(start_flag);
    frame.put_u8(body.len() as u8);
    frame.put_slice(body);
    frame.put_u8(body_checksum(body));

    Ok(frame.freeze())
}

/// Encode the frames the bridge writes for one snapshot
///
/// A servo frame is produced when there are servo values. A motor frame is
/// produced when `include_motors` is set and there are motor values.
///
/// # Errors
///
/// Returns `Protocol` if either body exceeds 255 values.
pub fn encode_snapshot_frames(snapshot: &PwmSnapshot, include_motors: bool) -> Result<Vec<Bytes>> {
    let mut frames = Vec::with_capacity(2);

    let servos = snapshot.servo_values();
    if !servos.is_empty() {
        frames.push(encode_frame(SERVO_START_FLAG, &servos)?);
    }

    if include_motors {
        let motors = snapshot.motor_values();
        if !motors.is_empty() {
            frames.push(encode_frame(MOTOR_START_FLAG, &motors)?);
        }
    }

    Ok(frames)
}
