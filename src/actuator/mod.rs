//! # Actuator Module
//!
//! Servo and motor actuator records and the collections that own them.
//!
//! This module handles:
//! - The PWM channel value type with its `[min, max]` clamping rules
//! - Sequential index allocation, owned per collection
//! - Gamepad bindings (see [`binding`])
//! - The servo and motor records themselves
//!
//! ## Value Ranges
//!
//! - PWM bounds: 0-255 (8-bit)
//! - PWM value: stored as `f64` so small per-frame increments accumulate,
//!   transmitted rounded to the nearest integer
//! - Default value: 127 (midpoint)

pub mod binding;
pub mod motor;
pub mod servo;

pub use binding::Binding;
pub use motor::Motor;
pub use servo::Servo;

use crate::error::{ArmControllerError, Result};

/// Lowest PWM value a channel can be bounded to.
pub const PWM_MIN: u8 = 0;

/// Highest PWM value a channel can be bounded to.
pub const PWM_MAX: u8 = 255;

/// Midpoint PWM value, used as the initial value and the motor rest value.
pub const PWM_CENTER: f64 = 127.0;

/// A PWM value together with the bounds it is clamped into.
///
/// `min <= value <= max` holds after every mutation.
///
/// # Examples
///
/// ```
/// use robot_arm_controller::actuator::PwmChannel;
///
/// let mut channel = PwmChannel::default();
/// channel.set_value(300.0);
/// assert_eq!(channel.value(), 255.0);
///
/// channel.set_max(100);
/// assert_eq!(channel.value(), 100.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwmChannel {
    value: f64,
    min: u8,
    max: u8,
}

impl Default for PwmChannel {
    fn default() -> Self {
        Self {
            value: PWM_CENTER,
            min: PWM_MIN,
            max: PWM_MAX,
        }
    }
}

impl PwmChannel {
    /// Current (fractional) value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value rounded to the nearest integer, as sent over the wire.
    pub fn rounded(&self) -> u8 {
        // value is always inside [min, max] which is inside [0, 255]
        self.value.round() as u8
    }

    /// Lower bound.
    pub fn min(&self) -> u8 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> u8 {
        self.max
    }

    /// Sets the value, clamped into `[min, max]`. NaN is ignored.
    pub fn set_value(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.value = value.clamp(f64::from(self.min), f64::from(self.max));
    }

    /// Adds `delta` to the value, clamped into `[min, max]`.
    pub fn add(&mut self, delta: f64) {
        self.set_value(self.value + delta);
    }

    /// Sets the lower bound. Raises `max` to meet it if needed, then re-clamps.
    pub fn set_min(&mut self, min: u8) {
        self.min = min;
        if self.max < min {
            self.max = min;
        }
        self.set_value(self.value);
    }

    /// Sets the upper bound. Lowers `min` to meet it if needed, then re-clamps.
    pub fn set_max(&mut self, max: u8) {
        self.max = max;
        if self.min > max {
            self.min = max;
        }
        self.set_value(self.value);
    }
}

/// Converts any integer into the 0-255 bound range.
pub fn clamp_bound(value: i64) -> u8 {
    value.clamp(i64::from(PWM_MIN), i64::from(PWM_MAX)) as u8
}

/// Highest index a save file may place an actuator at.
pub const MAX_LOADED_INDEX: usize = 65_535;

/// Hands out sequential actuator indices.
///
/// Explicitly placed indices (from a save file) push the counter past them
/// so later allocations stay unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAllocator {
    next: usize,
}

impl IndexAllocator {
    /// Creates an allocator starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next free index and advances.
    pub fn allocate(&mut self) -> usize {
        let index = self.next;
        self.next += 1;
        index
    }

    /// Marks `index` as used.
    pub fn reserve(&mut self, index: usize) {
        self.next = self.next.max(index + 1);
    }

    /// Starts counting from 0 again.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// The index the next [`allocate`](Self::allocate) call will return.
    pub fn peek(&self) -> usize {
        self.next
    }
}

/// Behaviour shared by servos and motors.
pub trait Actuator {
    /// Human readable kind ("servo" or "motor").
    const KIND: &'static str;

    /// Creates a default actuator with the given index.
    fn with_index(index: usize) -> Self;

    /// Unique index within the owning collection.
    fn index(&self) -> usize;

    /// The PWM channel.
    fn channel(&self) -> &PwmChannel;

    /// The PWM channel, mutably.
    fn channel_mut(&mut self) -> &mut PwmChannel;
}

/// An ordered collection of actuators with unique indices.
#[derive(Debug, Clone)]
pub struct ActuatorSet<T> {
    items: Vec<T>,
    allocator: IndexAllocator,
}

impl<T> Default for ActuatorSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            allocator: IndexAllocator::new(),
        }
    }
}

impl<T: Actuator> ActuatorSet<T> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default actuator with the next free index and returns it.
    pub fn add(&mut self) -> &mut T {
        let index = self.allocator.allocate();
        let position = self.items.len();
        self.items.push(T::with_index(index));
        &mut self.items[position]
    }

    /// Inserts an actuator that already carries an index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSaveFile` if the index is already taken or above
    /// [`MAX_LOADED_INDEX`].
    pub fn insert(&mut self, actuator: T) -> Result<()> {
        let index = actuator.index();
        if index > MAX_LOADED_INDEX {
            return Err(ArmControllerError::InvalidSaveFile(format!(
                "{} index {} is too large (max {})",
                T::KIND,
                index,
                MAX_LOADED_INDEX
            )));
        }
        if self.get(index).is_some() {
            return Err(ArmControllerError::InvalidSaveFile(format!(
                "duplicate {} index {}",
                T::KIND,
                index
            )));
        }
        self.allocator.reserve(index);
        self.items.push(actuator);
        Ok(())
    }

    /// Removes every actuator and resets index allocation to 0.
    pub fn clear(&mut self) {
        self.items.clear();
        self.allocator.reset();
    }

    /// Looks up an actuator by index.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.iter().find(|a| a.index() == index)
    }

    /// Looks up an actuator by index, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.iter_mut().find(|a| a.index() == index)
    }

    /// Looks up an actuator or reports which one was missing.
    ///
    /// # Errors
    ///
    /// Returns `UnknownActuator` if no actuator has this index.
    pub fn require_mut(&mut self, index: usize) -> Result<&mut T> {
        self.get_mut(index)
            .ok_or(ArmControllerError::UnknownActuator { kind: T::KIND, index })
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Number of actuators.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no actuators.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index the next [`add`](Self::add) will assign.
    pub fn next_index(&self) -> usize {
        self.allocator.peek()
    }
}
