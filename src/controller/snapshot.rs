//! # Gamepad Snapshot Module
//!
//! Point-in-time state of every connected gamepad, sampled once per frame.
//!
//! ## Value Ranges
//!
//! | Input | Range | Rest |
//! |-------|-------|------|
//! | Axis | -1.0 to 1.0 | 0.0 |
//! | Button | 0.0 to 1.0 | 0.0 |
//!
//! Gamepads are addressed by slot index. Slots of disconnected gamepads stay
//! empty and are reused by the next gamepad that connects, so an index can
//! refer to a different device after a reconnect.

/// Snapshot of one gamepad.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadSnapshot {
    /// Slot index.
    pub index: usize,
    /// Device name reported by the system.
    pub name: String,
    /// Normalised axis values (-1.0 to 1.0).
    pub axes: Vec<f32>,
    /// Button values (0.0 released to 1.0 fully pressed).
    pub buttons: Vec<f32>,
}

/// Snapshots of all gamepad slots for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadSnapshots {
    slots: Vec<Option<GamepadSnapshot>>,
}

impl GamepadSnapshots {
    /// No gamepads connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds snapshots from slot-ordered entries (`None` = empty slot).
    pub fn from_slots(slots: Vec<Option<GamepadSnapshot>>) -> Self {
        Self { slots }
    }

    /// Gamepad in slot `index`, if connected.
    pub fn get(&self, index: usize) -> Option<&GamepadSnapshot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Connected gamepads in slot order.
    pub fn connected(&self) -> impl Iterator<Item = &GamepadSnapshot> {
        self.slots.iter().flatten()
    }

    /// True when no gamepad is connected.
    pub fn is_empty(&self) -> bool {
        self.connected().next().is_none()
    }
}

/// Gamepad connection change reported by a [`GamepadSource`](super::GamepadSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadEvent {
    /// A gamepad appeared in this slot.
    Connected(usize),
    /// The gamepad in this slot went away.
    Disconnected(usize),
}
