//! # Gamepad Binding Module
//!
//! Which physical gamepad input, if any, drives an actuator attribute.
//!
//! A binding is picked in two steps: first a gamepad, then one of its axes
//! or buttons. Input indices mean different things on different devices, so
//! switching to another gamepad always drops the selected input.
//!
//! Resolution fails open: a binding whose gamepad is not connected this
//! frame, or whose input index is out of range for that device, reads as
//! unbound.

use crate::controller::snapshot::GamepadSnapshots;
use crate::error::{ArmControllerError, Result};

/// Binding of one actuator role to a gamepad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// Nothing selected.
    #[default]
    Unbound,
    /// A gamepad is selected but no input on it yet.
    Gamepad {
        /// Gamepad slot index.
        gamepad: usize,
    },
    /// Fully bound to an input on a gamepad.
    Input {
        /// Gamepad slot index.
        gamepad: usize,
        /// Axis or button index on that gamepad.
        input: usize,
    },
}

impl Binding {
    /// Builds a binding from the optional pair used in save files.
    ///
    /// An input without a gamepad cannot be resolved and is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use robot_arm_controller::actuator::Binding;
    ///
    /// assert_eq!(Binding::from_parts(Some(0), Some(2)), Binding::Input { gamepad: 0, input: 2 });
    /// assert_eq!(Binding::from_parts(None, Some(2)), Binding::Unbound);
    /// ```
    pub fn from_parts(gamepad: Option<usize>, input: Option<usize>) -> Self {
        match (gamepad, input) {
            (Some(gamepad), Some(input)) => Self::Input { gamepad, input },
            (Some(gamepad), None) => Self::Gamepad { gamepad },
            (None, _) => Self::Unbound,
        }
    }

    /// Selected gamepad, if any.
    pub fn gamepad(&self) -> Option<usize> {
        match *self {
            Self::Unbound => None,
            Self::Gamepad { gamepad } | Self::Input { gamepad, .. } => Some(gamepad),
        }
    }

    /// Selected input, if any.
    pub fn input(&self) -> Option<usize> {
        match *self {
            Self::Input { input, .. } => Some(input),
            _ => None,
        }
    }

    /// Selects a gamepad (or none).
    ///
    /// Changing the gamepad resets the input to unselected. Selecting the
    /// gamepad that is already selected keeps the input.
    pub fn select_gamepad(&mut self, gamepad: Option<usize>) {
        if self.gamepad() == gamepad {
            return;
        }
        *self = match gamepad {
            Some(gamepad) => Self::Gamepad { gamepad },
            None => Self::Unbound,
        };
    }

    /// Selects an input on the already selected gamepad (or clears it).
    ///
    /// # Errors
    ///
    /// Returns `NoGamepadSelected` when selecting an input with no gamepad.
    pub fn select_input(&mut self, input: Option<usize>) -> Result<()> {
        let gamepad = match (self.gamepad(), input) {
            (Some(gamepad), _) => gamepad,
            (None, None) => return Ok(()),
            (None, Some(_)) => return Err(ArmControllerError::NoGamepadSelected),
        };
        *self = Self::from_parts(Some(gamepad), input);
        Ok(())
    }

    /// Reads the bound axis value from this frame's snapshots.
    pub fn resolve_axis(&self, gamepads: &GamepadSnapshots) -> Option<f32> {
        let (gamepad, input) = self.target()?;
        gamepads.get(gamepad)?.axes.get(input).copied()
    }

    /// Reads the bound button value from this frame's snapshots.
    pub fn resolve_button(&self, gamepads: &GamepadSnapshots) -> Option<f32> {
        let (gamepad, input) = self.target()?;
        gamepads.get(gamepad)?.buttons.get(input).copied()
    }

    fn target(&self) -> Option<(usize, usize)> {
        match *self {
            Self::Input { gamepad, input } => Some((gamepad, input)),
            _ => None,
        }
    }
}
