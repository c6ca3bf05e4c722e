//! # Error Types
//!
//! Custom error types for the robot arm controller using `thiserror`.

use thiserror::Error;

/// Main error type for the robot arm controller
#[derive(Debug, Error)]
pub enum ArmControllerError {
    /// Wire protocol errors (serial frames, WebSocket handshake)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors (wire messages, save files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A save file was selected that is not declared as JSON
    #[error("Must be a .json savefile: {0}")]
    NotJsonSaveFile(String),

    /// A save file parsed but describes an impossible configuration
    #[error("Invalid save file: {0}")]
    InvalidSaveFile(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial port could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Gamepad device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Operator command could not be parsed
    #[error("Command error: {0}")]
    Command(String),

    /// Operator referred to an actuator that does not exist
    #[error("No {kind} with index {index}")]
    UnknownActuator { kind: &'static str, index: usize },

    /// An input was selected on a binding that has no gamepad
    #[error("Select a gamepad before selecting an input")]
    NoGamepadSelected,
}

/// Result type alias for the robot arm controller
pub type Result<T> = std::result::Result<T, ArmControllerError>;
