//! # Serial Communication Module
//!
//! Handles serial communication with the arm's microcontroller.
//!
//! This module handles:
//! - Opening the serial port at the configured baud rate (8N1)
//! - Splitting the port into a frame writer and a text reader
//! - Sending servo and motor frames

pub mod port_trait;

use crate::error::{ArmControllerError, Result};
use port_trait::{FramePort, SerialPortIO};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Default baud rate; must match the microcontroller sketch.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Write side of an opened port.
pub type SerialWriter = FramePort<WriteHalf<SerialStream>>;

/// Read side of an opened port.
pub type SerialReader = ReadHalf<SerialStream>;

/// Serial port to the microcontroller
pub struct ArmSerial {
    /// Serial port handle
    port: SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for ArmSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ArmSerial {
    /// Open the serial port at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the port cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robot_arm_controller::serial::{ArmSerial, DEFAULT_BAUD_RATE};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = ArmSerial::open("/dev/ttyACM0", DEFAULT_BAUD_RATE)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!("Opening serial port: {}", path);
        let port = Self::open_port(path, baud_rate).map_err(|e| {
            warn!("{}", e);
            ArmControllerError::SerialPortNotFound(path.to_string())
        })?;
        info!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| ArmControllerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into a reader for device text and a writer for frames
    pub fn into_split(self) -> (SerialReader, SerialWriter) {
        let (reader, writer) = tokio::io::split(self.port);
        (reader, FramePort::new(writer))
    }
}

/// Write one frame and flush
///
/// # Arguments
///
/// * `port` - Any [`SerialPortIO`] implementation
/// * `frame` - Complete frame (flag, length, body, checksum)
///
/// # Errors
///
/// Returns `Serial` if the write or flush fails.
pub async fn send_frame<P: SerialPortIO>(port: &mut P, frame: &[u8]) -> Result<()> {
    port.write_all(frame)
        .await
        .map_err(|e| ArmControllerError::Serial(format!("Failed to write frame: {}", e)))?;

    port.flush()
        .await
        .map_err(|e| ArmControllerError::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("Sent serial frame ({} bytes)", frame.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use crate::link::encoder::encode_frame;
    use crate::link::protocol::SERVO_START_FLAG;
    use std::io;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BAUD_RATE, 19_200);
    }

    #[test]
    fn test_open_missing_port_returns_not_found() {
        match ArmSerial::open("/dev/nonexistent0", DEFAULT_BAUD_RATE) {
            Err(ArmControllerError::SerialPortNotFound(msg)) => {
                assert_eq!(msg, "/dev/nonexistent0");
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = ArmSerial::open_port("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE);

        match result {
            Err(ArmControllerError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_send_frame_writes_bytes() {
        let mut port = MockSerialPort::new();
        let frame = encode_frame(SERVO_START_FLAG, &[130, 64]).unwrap();

        send_frame(&mut port, &frame).await.unwrap();

        assert_eq!(port.frames(), vec![vec![0x02, 2, 130, 64, 194]]);
    }

    #[tokio::test]
    async fn test_send_frame_write_error() {
        let mut port = MockSerialPort::new();
        port.fail_writes(io::ErrorKind::BrokenPipe);

        match send_frame(&mut port, &[0x02, 0, 0]).await {
            Err(ArmControllerError::Serial(msg)) => assert!(msg.contains("write")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert!(port.frames().is_empty());
    }

    #[tokio::test]
    async fn test_send_frame_flush_error() {
        let mut port = MockSerialPort::new();
        port.fail_flushes(io::ErrorKind::TimedOut);

        match send_frame(&mut port, &[0x02, 0, 0]).await {
            Err(ArmControllerError::Serial(msg)) => assert!(msg.contains("flush")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Integration test - only runs if the microcontroller is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_send_frame_with_real_hardware() {
        if let Ok(serial) = ArmSerial::open("/dev/ttyACM0", DEFAULT_BAUD_RATE) {
            let (_reader, mut writer) = serial.into_split();
            let frame = encode_frame(SERVO_START_FLAG, &[127]).unwrap();
            let result = send_frame(&mut writer, &frame).await;
            assert!(result.is_ok(), "Failed to send frame: {:?}", result);
        } else {
            println!("No serial hardware detected (skipping send test)");
        }
    }
}
