//! # PWM Engine Module
//!
//! Turns a frame's gamepad snapshots plus elapsed time into new PWM values.
//!
//! ## Servo Update
//!
//! | Binding | Effect per frame |
//! |---------|------------------|
//! | Axis | `pwm += value * axis_speed * dt` when `|value| > deadzone` |
//! | Increase button | `pwm += value * button_speed * dt` |
//! | Decrease button | `pwm -= value * button_speed * dt` |
//!
//! All three may apply in the same frame; each one clamps.
//!
//! ## Motor Update
//!
//! The motor deadzone is a quarter of the servo deadzone. Outside it the PWM
//! is set to `(value + 1) / 2 * 255`; inside it the PWM returns to 127.
//!
//! ## Usage
//!
//! ```
//! use robot_arm_controller::actuator::{Actuator, Binding, Servo};
//! use robot_arm_controller::controller::engine::PwmEngine;
//! use robot_arm_controller::controller::snapshot::{GamepadSnapshot, GamepadSnapshots};
//!
//! let engine = PwmEngine::default();
//! let mut servo = Servo::with_index(0);
//! servo.axis = Binding::Input { gamepad: 0, input: 2 };
//!
//! let pad = GamepadSnapshot { index: 0, name: String::new(), axes: vec![0.0, 0.0, 0.5], buttons: vec![] };
//! let gamepads = GamepadSnapshots::from_slots(vec![Some(pad)]);
//!
//! engine.apply_servo(&mut servo, &gamepads, 100.0);
//! assert!((servo.channel.value() - 132.0).abs() < 1e-6);
//! ```

use crate::actuator::{ActuatorSet, Motor, Servo, PWM_CENTER, PWM_MAX};
use super::snapshot::GamepadSnapshots;

/// Default axis deadzone, large enough to swallow stick drift.
pub const DEFAULT_AXIS_DEADZONE: f32 = 0.2;

/// Motor deadzone as a fraction of the axis deadzone.
pub const MOTOR_DEADZONE_DIVISOR: f32 = 4.0;

/// Applies bound gamepad inputs to actuators.
#[derive(Debug, Clone, Copy)]
pub struct PwmEngine {
    /// Servo axis deadzone (0.0 to 0.5).
    deadzone: f32,
}

impl Default for PwmEngine {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_AXIS_DEADZONE,
        }
    }
}

impl PwmEngine {
    /// Creates an engine with the given servo axis deadzone.
    ///
    /// Values outside 0.0 to 0.5 are clamped.
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.5),
        }
    }

    /// Servo axis deadzone.
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    /// Motor axis deadzone.
    pub fn motor_deadzone(&self) -> f32 {
        self.deadzone / MOTOR_DEADZONE_DIVISOR
    }

    /// Updates every servo then every motor.
    pub fn apply_all(
        &self,
        servos: &mut ActuatorSet<Servo>,
        motors: &mut ActuatorSet<Motor>,
        gamepads: &GamepadSnapshots,
        delta_ms: f64,
    ) {
        for servo in servos.iter_mut() {
            self.apply_servo(servo, gamepads, delta_ms);
        }
        for motor in motors.iter_mut() {
            self.apply_motor(motor, gamepads);
        }
    }

    /// Accumulates axis and button input into a servo.
    pub fn apply_servo(&self, servo: &mut Servo, gamepads: &GamepadSnapshots, delta_ms: f64) {
        if let Some(value) = servo.axis.resolve_axis(gamepads) {
            if value.abs() > self.deadzone {
                servo.channel.add(f64::from(value) * servo.axis_speed * delta_ms);
            }
        }

        if let Some(value) = servo.increase.resolve_button(gamepads) {
            servo.channel.add(f64::from(value) * servo.button_speed * delta_ms);
        }

        if let Some(value) = servo.decrease.resolve_button(gamepads) {
            servo.channel.add(-f64::from(value) * servo.button_speed * delta_ms);
        }
    }

    /// Sets a motor directly from its axis.
    pub fn apply_motor(&self, motor: &mut Motor, gamepads: &GamepadSnapshots) {
        let Some(value) = motor.axis.resolve_axis(gamepads) else {
            return;
        };

        if value.abs() > self.motor_deadzone() {
            motor.channel.set_value(Self::scale_axis_to_pwm(value));
        } else {
            motor.channel.set_value(PWM_CENTER);
        }
    }

    /// Maps an axis value (-1.0 to 1.0) linearly onto 0-255.
    #[inline]
    fn scale_axis_to_pwm(value: f32) -> f64 {
        (f64::from(value) + 1.0) / 2.0 * f64::from(PWM_MAX)
    }
}
