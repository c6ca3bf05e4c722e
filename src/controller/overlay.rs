//! # Gamepad Naming Overlays
//!
//! Operator-assigned names for gamepads and their inputs, keyed by gamepad
//! slot index. Overlays are cosmetic: they only change how bindings are
//! described, never how inputs are resolved.

use super::snapshot::GamepadSnapshot;
use crate::error::{ArmControllerError, Result};

/// Highest number of labels kept per input kind.
pub const MAX_INPUT_LABELS: usize = 256;

/// Display name and input labels for one gamepad slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamepadOverlay {
    /// Gamepad slot index.
    pub index: usize,
    /// Operator label for the gamepad; empty means unnamed.
    pub name: String,
    /// Button labels by button index.
    pub buttons: Vec<String>,
    /// Axis labels by axis index.
    pub axes: Vec<String>,
}

impl GamepadOverlay {
    /// Creates an overlay with empty labels sized to the device.
    pub fn for_gamepad(gamepad: &GamepadSnapshot) -> Self {
        Self {
            index: gamepad.index,
            name: String::new(),
            buttons: vec![String::new(); gamepad.buttons.len()],
            axes: vec![String::new(); gamepad.axes.len()],
        }
    }

    /// Label for an axis, or `"Axis N"` when unnamed.
    pub fn axis_label(&self, axis: usize) -> String {
        label_or(&self.axes, axis, "Axis")
    }

    /// Label for a button, or `"Button N"` when unnamed.
    pub fn button_label(&self, button: usize) -> String {
        label_or(&self.buttons, button, "Button")
    }

    /// Sets an axis label, growing the label list as needed.
    ///
    /// # Errors
    ///
    /// Returns `Command` if `axis` is not below [`MAX_INPUT_LABELS`].
    pub fn set_axis_label(&mut self, axis: usize, label: &str) -> Result<()> {
        set_label(&mut self.axes, axis, label)
    }

    /// Sets a button label, growing the label list as needed.
    ///
    /// # Errors
    ///
    /// Returns `Command` if `button` is not below [`MAX_INPUT_LABELS`].
    pub fn set_button_label(&mut self, button: usize, label: &str) -> Result<()> {
        set_label(&mut self.buttons, button, label)
    }
}

fn label_or(labels: &[String], index: usize, fallback: &str) -> String {
    match labels.get(index) {
        Some(label) if !label.is_empty() => label.clone(),
        _ => format!("{} {}", fallback, index),
    }
}

/// Checks that an input index can carry a label.
///
/// # Errors
///
/// Returns `Command` if `index` is not below [`MAX_INPUT_LABELS`].
pub fn check_label_index(index: usize) -> Result<()> {
    if index < MAX_INPUT_LABELS {
        Ok(())
    } else {
        Err(ArmControllerError::Command(format!(
            "input index {} is too large (max {})",
            index,
            MAX_INPUT_LABELS - 1
        )))
    }
}

fn set_label(labels: &mut Vec<String>, index: usize, label: &str) -> Result<()> {
    check_label_index(index)?;
    if labels.len() <= index {
        labels.resize(index + 1, String::new());
    }
    labels[index] = label.to_string();
    Ok(())
}

/// Overlays for every gamepad slot seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamepadOverlays {
    overlays: Vec<GamepadOverlay>,
}

impl GamepadOverlays {
    /// No overlays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay for a slot, if one exists.
    pub fn get(&self, index: usize) -> Option<&GamepadOverlay> {
        self.overlays.iter().find(|o| o.index == index)
    }

    /// Overlay for a slot, creating an empty one if missing.
    pub fn get_or_create(&mut self, index: usize) -> &mut GamepadOverlay {
        let position = match self.overlays.iter().position(|o| o.index == index) {
            Some(position) => position,
            None => {
                self.overlays.push(GamepadOverlay {
                    index,
                    ..GamepadOverlay::default()
                });
                self.overlays.len() - 1
            }
        };
        &mut self.overlays[position]
    }

    /// Adds a default overlay for a newly connected gamepad.
    ///
    /// An existing overlay for the slot is kept.
    pub fn ensure(&mut self, gamepad: &GamepadSnapshot) {
        if self.get(gamepad.index).is_none() {
            self.overlays.push(GamepadOverlay::for_gamepad(gamepad));
            self.overlays.sort_by_key(|o| o.index);
        }
    }

    /// Replaces every overlay, keeping the last one for a repeated index.
    pub fn replace(&mut self, overlays: Vec<GamepadOverlay>) {
        self.overlays.clear();
        for overlay in overlays {
            self.overlays.retain(|o| o.index != overlay.index);
            self.overlays.push(overlay);
        }
        self.overlays.sort_by_key(|o| o.index);
    }

    /// Removes every overlay.
    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    /// Overlays in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &GamepadOverlay> {
        self.overlays.iter()
    }

    /// Number of overlays.
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    /// True when there are no overlays.
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Describes a gamepad: overlay name, device name, or `"Gamepad N"`.
    pub fn gamepad_label(&self, index: usize, device_name: Option<&str>) -> String {
        match (self.get(index), device_name) {
            (Some(overlay), _) if !overlay.name.is_empty() => overlay.name.clone(),
            (_, Some(name)) if !name.is_empty() => name.to_string(),
            _ => format!("Gamepad {}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(index: usize) -> GamepadSnapshot {
        GamepadSnapshot {
            index,
            name: "Pad".to_string(),
            axes: vec![0.0; 4],
            buttons: vec![0.0; 12],
        }
    }

    #[test]
    fn test_for_gamepad_sizes_labels() {
        let overlay = GamepadOverlay::for_gamepad(&pad(1));
        assert_eq!(overlay.index, 1);
        assert!(overlay.name.is_empty());
        assert_eq!(overlay.axes.len(), 4);
        assert_eq!(overlay.buttons.len(), 12);
    }

    #[test]
    fn test_label_fallbacks() {
        let mut overlay = GamepadOverlay::for_gamepad(&pad(0));
        assert_eq!(overlay.axis_label(2), "Axis 2");
        overlay.set_axis_label(2, "Left Y").unwrap();
        assert_eq!(overlay.axis_label(2), "Left Y");
        assert_eq!(overlay.button_label(20), "Button 20");
    }

    #[test]
    fn test_set_label_grows() {
        let mut overlay = GamepadOverlay::default();
        overlay.set_button_label(3, "Claw").unwrap();
        assert_eq!(overlay.buttons.len(), 4);
        assert_eq!(overlay.button_label(3), "Claw");
    }

    #[test]
    fn test_set_label_rejects_huge_index() {
        let mut overlay = GamepadOverlay::default();
        assert!(overlay.set_axis_label(usize::MAX, "x").is_err());
        assert!(overlay.set_button_label(MAX_INPUT_LABELS, "x").is_err());
        assert!(overlay.axes.is_empty());
        assert!(overlay.buttons.is_empty());

        overlay.set_button_label(MAX_INPUT_LABELS - 1, "Last").unwrap();
        assert_eq!(overlay.buttons.len(), MAX_INPUT_LABELS);
    }

    #[test]
    fn test_ensure_keeps_existing() {
        let mut overlays = GamepadOverlays::new();
        overlays.get_or_create(0).name = "Left hand".to_string();
        overlays.ensure(&pad(0));
        overlays.ensure(&pad(1));

        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays.get(0).unwrap().name, "Left hand");
        assert_eq!(overlays.get(1).unwrap().buttons.len(), 12);
    }

    #[test]
    fn test_replace_sorts_and_dedups() {
        let mut overlays = GamepadOverlays::new();
        overlays.ensure(&pad(5));
        overlays.replace(vec![
            GamepadOverlay { index: 2, name: "b".into(), ..Default::default() },
            GamepadOverlay { index: 0, name: "a".into(), ..Default::default() },
            GamepadOverlay { index: 2, name: "c".into(), ..Default::default() },
        ]);

        let names: Vec<_> = overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(overlays.get(5).is_none());
    }

    #[test]
    fn test_gamepad_label() {
        let mut overlays = GamepadOverlays::new();
        assert_eq!(overlays.gamepad_label(0, None), "Gamepad 0");
        assert_eq!(overlays.gamepad_label(0, Some("DualSense")), "DualSense");
        overlays.get_or_create(0).name = "Arm".to_string();
        assert_eq!(overlays.gamepad_label(0, Some("DualSense")), "Arm");
    }
}
