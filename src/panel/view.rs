//! # Panel View
//!
//! Plain view model of the panel. [`PanelView::refresh`] copies what the
//! operator sees out of the live state; [`PanelView::render`] turns it into
//! text. The view never holds references into the actuator collections.

use std::fmt::Write;

use crate::actuator::{Actuator, ActuatorSet, Binding, Motor, Servo};
use crate::controller::overlay::GamepadOverlays;
use crate::controller::snapshot::GamepadSnapshots;
use crate::transport::ConnectionState;

/// Whether a binding reads an axis or a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Axis,
    Button,
}

/// One servo line.
#[derive(Debug, Clone, PartialEq)]
pub struct ServoRow {
    /// Servo index.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Rounded PWM value.
    pub pwm: u8,
    /// Lower bound.
    pub min: u8,
    /// Upper bound.
    pub max: u8,
    /// Axis speed.
    pub axis_speed: f64,
    /// Button speed.
    pub button_speed: f64,
    /// Axis binding description.
    pub axis: String,
    /// Increase button description.
    pub increase: String,
    /// Decrease button description.
    pub decrease: String,
}

/// One motor line.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorRow {
    /// Motor index.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Rounded PWM value.
    pub pwm: u8,
    /// Lower bound.
    pub min: u8,
    /// Upper bound.
    pub max: u8,
    /// Axis binding description.
    pub axis: String,
}

/// One connected gamepad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadRow {
    /// Gamepad slot.
    pub index: usize,
    /// Overlay name, device name or placeholder.
    pub label: String,
    /// Number of axes.
    pub axes: usize,
    /// Number of buttons.
    pub buttons: usize,
}

/// View model of the whole panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    connection: ConnectionState,
    servos: Vec<ServoRow>,
    motors: Vec<MotorRow>,
    gamepads: Vec<GamepadRow>,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            servos: Vec::new(),
            motors: Vec::new(),
            gamepads: Vec::new(),
        }
    }
}

impl PanelView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds every row from the current state.
    pub fn refresh(
        &mut self,
        servos: &ActuatorSet<Servo>,
        motors: &ActuatorSet<Motor>,
        gamepads: &GamepadSnapshots,
        overlays: &GamepadOverlays,
        connection: ConnectionState,
    ) {
        let describe = |binding: &Binding, kind| describe_binding(binding, kind, gamepads, overlays);

        self.connection = connection;

        self.servos = servos
            .iter()
            .map(|servo| ServoRow {
                index: servo.index(),
                name: servo.display_name(),
                pwm: servo.channel.rounded(),
                min: servo.channel.min(),
                max: servo.channel.max(),
                axis_speed: servo.axis_speed,
                button_speed: servo.button_speed,
                axis: describe(&servo.axis, InputKind::Axis),
                increase: describe(&servo.increase, InputKind::Button),
                decrease: describe(&servo.decrease, InputKind::Button),
            })
            .collect();

        self.motors = motors
            .iter()
            .map(|motor| MotorRow {
                index: motor.index(),
                name: motor.display_name(),
                pwm: motor.channel.rounded(),
                min: motor.channel.min(),
                max: motor.channel.max(),
                axis: describe(&motor.axis, InputKind::Axis),
            })
            .collect();

        self.gamepads = gamepads
            .connected()
            .map(|pad| GamepadRow {
                index: pad.index,
                label: overlays.gamepad_label(pad.index, Some(&pad.name)),
                axes: pad.axes.len(),
                buttons: pad.buttons.len(),
            })
            .collect();
    }

    /// Connection state at the last refresh.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Servo rows.
    pub fn servos(&self) -> &[ServoRow] {
        &self.servos
    }

    /// Motor rows.
    pub fn motors(&self) -> &[MotorRow] {
        &self.motors
    }

    /// Gamepad rows.
    pub fn gamepads(&self) -> &[GamepadRow] {
        &self.gamepads
    }

    /// Renders the view as console text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Connection: {}", self.connection)?;

        writeln!(out, "Servos:")?;
        if self.servos.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for row in &self.servos {
            writeln!(
                out,
                "  [{}] {}  pwm {}  ({}-{})  axis-speed {}  button-speed {}",
                row.index, row.name, row.pwm, row.min, row.max, row.axis_speed, row.button_speed
            )?;
            writeln!(
                out,
                "      axis: {} | increase: {} | decrease: {}",
                row.axis, row.increase, row.decrease
            )?;
        }

        writeln!(out, "Motors:")?;
        if self.motors.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for row in &self.motors {
            writeln!(
                out,
                "  [{}] {}  pwm {}  ({}-{})",
                row.index, row.name, row.pwm, row.min, row.max
            )?;
            writeln!(out, "      axis: {}", row.axis)?;
        }

        writeln!(out, "Gamepads:")?;
        if self.gamepads.is_empty() {
            writeln!(out, "  (none connected)")?;
        }
        for row in &self.gamepads {
            writeln!(
                out,
                "  [{}] {}  {} axes, {} buttons",
                row.index, row.label, row.axes, row.buttons
            )?;
        }

        Ok(())
    }
}

fn describe_binding(
    binding: &Binding,
    kind: InputKind,
    gamepads: &GamepadSnapshots,
    overlays: &GamepadOverlays,
) -> String {
    let Some(gamepad) = binding.gamepad() else {
        return "unbound".to_string();
    };

    let device = gamepads.get(gamepad);
    let mut text = overlays.gamepad_label(gamepad, device.map(|pad| pad.name.as_str()));

    match binding.input() {
        Some(input) => {
            let overlay = overlays.get(gamepad);
            let label = match (kind, overlay) {
                (InputKind::Axis, Some(overlay)) => overlay.axis_label(input),
                (InputKind::Button, Some(overlay)) => overlay.button_label(input),
                (InputKind::Axis, None) => format!("Axis {}", input),
                (InputKind::Button, None) => format!("Button {}", input),
            };
            text.push_str(" / ");
            text.push_str(&label);
        }
        None => text.push_str(" / (no input)"),
    }

    if device.is_none() {
        text.push_str(" (disconnected)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::snapshot::GamepadSnapshot;

    fn one_pad() -> GamepadSnapshots {
        GamepadSnapshots::from_slots(vec![Some(GamepadSnapshot {
            index: 0,
            name: "DualSense".to_string(),
            axes: vec![0.0; 4],
            buttons: vec![0.0; 12],
        })])
    }

    #[test]
    fn test_refresh_rows() {
        let mut servos = ActuatorSet::<Servo>::new();
        let servo = servos.add();
        servo.channel.set_value(131.6);
        servo.axis = Binding::Input { gamepad: 0, input: 2 };
        let mut motors = ActuatorSet::<Motor>::new();
        motors.add().name = "Drive".to_string();

        let mut overlays = GamepadOverlays::new();
        overlays.get_or_create(0).set_axis_label(2, "Right X").unwrap();

        let mut view = PanelView::new();
        view.refresh(&servos, &motors, &one_pad(), &overlays, ConnectionState::Connected);

        assert_eq!(view.servos().len(), 1);
        assert_eq!(view.servos()[0].name, "Servo 0");
        assert_eq!(view.servos()[0].pwm, 132);
        assert_eq!(view.servos()[0].axis, "DualSense / Right X");
        assert_eq!(view.servos()[0].increase, "unbound");
        assert_eq!(view.motors()[0].name, "Drive");
        assert_eq!(view.gamepads()[0].label, "DualSense");
        assert_eq!(view.gamepads()[0].buttons, 12);
        assert_eq!(view.connection(), ConnectionState::Connected);
    }

    #[test]
    fn test_describe_binding_states() {
        let pads = one_pad();
        let overlays = GamepadOverlays::new();

        assert_eq!(
            describe_binding(&Binding::Gamepad { gamepad: 0 }, InputKind::Button, &pads, &overlays),
            "DualSense / (no input)"
        );
        assert_eq!(
            describe_binding(
                &Binding::Input { gamepad: 0, input: 3 },
                InputKind::Button,
                &pads,
                &overlays
            ),
            "DualSense / Button 3"
        );
        assert_eq!(
            describe_binding(
                &Binding::Input { gamepad: 2, input: 0 },
                InputKind::Axis,
                &pads,
                &overlays
            ),
            "Gamepad 2 / Axis 0 (disconnected)"
        );
    }

    #[test]
    fn test_render_empty() {
        let text = PanelView::new().render();
        assert!(text.starts_with("Connection: disconnected\n"));
        assert!(text.contains("Servos:\n  (none)"));
        assert!(text.contains("Gamepads:\n  (none connected)"));
    }

    #[test]
    fn test_render_rows() {
        let mut servos = ActuatorSet::<Servo>::new();
        servos.add().name = "Base".to_string();

        let mut view = PanelView::new();
        view.refresh(
            &servos,
            &ActuatorSet::new(),
            &GamepadSnapshots::new(),
            &GamepadOverlays::new(),
            ConnectionState::Connecting,
        );

        let text = view.render();
        assert!(text.contains("Connection: connecting"));
        assert!(text.contains("[0] Base  pwm 127  (0-255)  axis-speed 0.1  button-speed 0.1"));
        assert!(text.contains("axis: unbound | increase: unbound | decrease: unbound"));
    }
}
