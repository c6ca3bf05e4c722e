//! # Link Protocol Module
//!
//! Message formats between the panel, the bridge and the microcontroller.
//!
//! This module handles:
//! - The JSON PWM snapshot sent over WebSocket once per frame
//! - Serial frame encoding (start flag, length, body, checksum)
//! - Serial frame decoding and validation
//! - The additive body checksum

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod protocol;
