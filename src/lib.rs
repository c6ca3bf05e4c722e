//! # Robot Arm Controller Library
//!
//! Drive the servos and motors of a robot arm from gamepads.
//!
//! The panel samples gamepads, integrates bound inputs into 8-bit PWM values
//! and streams them as JSON over a WebSocket. The bridge receives those
//! messages, encodes them into checksummed serial frames and writes them to
//! the arm's microcontroller.

pub mod actuator;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod logging;
pub mod panel;
pub mod persistence;
pub mod serial;
pub mod transport;
