//! # Servo Module
//!
//! A servo accumulates gamepad input into its PWM value over time: an axis
//! moves it proportionally to deflection, and a pair of buttons nudges it up
//! or down.

use super::{Actuator, Binding, PwmChannel};

/// Default PWM change per millisecond at full axis deflection.
pub const DEFAULT_AXIS_SPEED: f64 = 0.1;

/// Default PWM change per millisecond with a button fully pressed.
pub const DEFAULT_BUTTON_SPEED: f64 = 0.1;

/// Servo actuator record.
///
/// # Examples
///
/// ```
/// use robot_arm_controller::actuator::{Actuator, Servo};
///
/// let servo = Servo::with_index(3);
/// assert_eq!(servo.display_name(), "Servo 3");
/// assert_eq!(servo.channel().rounded(), 127);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Servo {
    index: usize,
    /// Operator label; empty means "Servo N".
    pub name: String,
    /// PWM value and bounds.
    pub channel: PwmChannel,
    /// PWM change per millisecond per unit of axis deflection.
    pub axis_speed: f64,
    /// PWM change per millisecond per unit of button pressure.
    pub button_speed: f64,
    /// Axis that moves the servo.
    pub axis: Binding,
    /// Button that increases the value.
    pub increase: Binding,
    /// Button that decreases the value.
    pub decrease: Binding,
}

impl Servo {
    /// Name shown to the operator.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Servo {}", self.index)
        } else {
            self.name.clone()
        }
    }

    /// Looks up a binding role by its console name.
    pub fn binding_mut(&mut self, role: ServoRole) -> &mut Binding {
        match role {
            ServoRole::Axis => &mut self.axis,
            ServoRole::Increase => &mut self.increase,
            ServoRole::Decrease => &mut self.decrease,
        }
    }
}

impl Actuator for Servo {
    const KIND: &'static str = "servo";

    fn with_index(index: usize) -> Self {
        Self {
            index,
            name: String::new(),
            channel: PwmChannel::default(),
            axis_speed: DEFAULT_AXIS_SPEED,
            button_speed: DEFAULT_BUTTON_SPEED,
            axis: Binding::Unbound,
            increase: Binding::Unbound,
            decrease: Binding::Unbound,
        }
    }

    fn index(&self) -> usize {
        self.index
    }

    fn channel(&self) -> &PwmChannel {
        &self.channel
    }

    fn channel_mut(&mut self) -> &mut PwmChannel {
        &mut self.channel
    }
}

/// The three bindable roles of a servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoRole {
    /// Axis input.
    Axis,
    /// Increase button.
    Increase,
    /// Decrease button.
    Decrease,
}
