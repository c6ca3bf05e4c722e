//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Sampling every connected gamepad into a per-frame snapshot
//! - Operator names for gamepads and their inputs
//! - Applying deadzones and bound inputs to servo and motor PWM values

pub mod engine;
pub mod evdev_pads;
pub mod overlay;
pub mod snapshot;

use snapshot::{GamepadEvent, GamepadSnapshots};

/// Source of per-frame gamepad state.
///
/// Implemented by [`evdev_pads::EvdevGamepads`] on Linux and mocked in tests.
#[cfg_attr(test, mockall::automock)]
pub trait GamepadSource {
    /// Returns the current state of every gamepad slot.
    fn sample(&mut self) -> GamepadSnapshots;

    /// Returns the connect/disconnect events seen since the last call.
    fn take_events(&mut self) -> Vec<GamepadEvent>;
}
