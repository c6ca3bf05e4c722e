//! # Motor Module
//!
//! A motor follows its bound axis directly: full negative deflection maps to
//! PWM 0, full positive to 255, and a stick at rest holds the midpoint.

use super::{Actuator, Binding, PwmChannel};

/// Motor actuator record.
#[derive(Debug, Clone, PartialEq)]
pub struct Motor {
    index: usize,
    /// Operator label; empty means "Motor N".
    pub name: String,
    /// PWM value and bounds.
    pub channel: PwmChannel,
    /// Axis that drives the motor.
    pub axis: Binding,
}

impl Motor {
    /// Name shown to the operator.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Motor {}", self.index)
        } else {
            self.name.clone()
        }
    }
}

impl Actuator for Motor {
    const KIND: &'static str = "motor";

    fn with_index(index: usize) -> Self {
        Self {
            index,
            name: String::new(),
            channel: PwmChannel::default(),
            axis: Binding::Unbound,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_defaults() {
        let motor = Motor::with_index(1);
        assert_eq!(motor.index(), 1);
        assert_eq!(motor.channel.rounded(), 127);
        assert_eq!(motor.axis, Binding::Unbound);
        assert_eq!(motor.display_name(), "Motor 1");
    }
}
