//! # Persistence Module
//!
//! Saves and loads the full panel configuration (gamepad overlays, servos,
//! motors) as a JSON document.
//!
//! ## Save File Schema
//!
//! ```json
//! {
//!     "gamepads": [ { "index": 0, "name": "", "buttons": [""], "axes": [""] } ],
//!     "servos": [ { "index": 0, "name": "", "pwm": 127, "min": 0, "max": 255,
//!                   "axisSpeed": 0.1, "axis": { "gamepadIndex": 0, "inputIndex": 2 },
//!                   "buttonSpeed": 0.1,
//!                   "buttonAdd": { "gamepadIndex": null, "inputIndex": null },
//!                   "buttonRemove": { "gamepadIndex": null, "inputIndex": null } } ],
//!     "motors": [ { "index": 0, "name": "", "pwm": 127, "min": 0, "max": 255,
//!                   "axis": { "gamepadIndex": 0, "axisIndex": 1 } } ]
//! }
//! ```
//!
//! ## Older Files
//!
//! | Older form | Read as |
//! |------------|---------|
//! | `increaseButton` / `decreaseButton` | `buttonAdd` / `buttonRemove` |
//! | motor axis `inputIndex` | `axisIndex` |
//! | `address` | `index` |
//! | binding as a bare integer `n` | gamepad 0, input `n` |
//! | missing `gamepads` / `motors`, names, speeds, bounds | defaults |
//!
//! Files are always written in the current schema.
//!
//! Loading is all-or-nothing: a file is only accepted if its extension is
//! `.json`, it parses, and its indices are unique. Nothing is applied
//! before all of that has been checked.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use tracing::{debug, info};

use crate::actuator::servo::{DEFAULT_AXIS_SPEED, DEFAULT_BUTTON_SPEED};
use crate::actuator::{
    clamp_bound, Actuator, ActuatorSet, Binding, Motor, Servo, PWM_CENTER, PWM_MAX, PWM_MIN,
};
use crate::controller::overlay::GamepadOverlay;
use crate::error::{ArmControllerError, Result};

/// File name used when the operator does not give one.
pub const DEFAULT_SAVE_PATH: &str = "save.json";

/// Whole save file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    /// Gamepad naming overlays.
    #[serde(default, deserialize_with = "null_as_default")]
    pub gamepads: Vec<GamepadRecord>,
    /// Servos.
    #[serde(default, deserialize_with = "null_as_default")]
    pub servos: Vec<ServoRecord>,
    /// Motors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub motors: Vec<MotorRecord>,
}

/// Saved gamepad overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamepadRecord {
    /// Gamepad slot index.
    pub index: usize,
    /// Operator label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Button labels.
    #[serde(default, deserialize_with = "null_as_default")]
    pub buttons: Vec<String>,
    /// Axis labels.
    #[serde(default, deserialize_with = "null_as_default")]
    pub axes: Vec<String>,
}

/// Saved servo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServoRecord {
    /// Servo index.
    #[serde(alias = "address")]
    pub index: usize,
    /// Operator label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// PWM value; written rounded.
    #[serde(default = "default_pwm", serialize_with = "as_integer")]
    pub pwm: f64,
    /// Lower bound.
    #[serde(default = "default_min", serialize_with = "as_integer")]
    pub min: f64,
    /// Upper bound.
    #[serde(default = "default_max", serialize_with = "as_integer")]
    pub max: f64,
    /// PWM per millisecond per unit of axis deflection.
    #[serde(default = "default_axis_speed")]
    pub axis_speed: f64,
    /// Axis binding.
    #[serde(default, deserialize_with = "migrate_binding")]
    pub axis: InputBinding,
    /// PWM per millisecond per unit of button pressure.
    #[serde(default = "default_button_speed")]
    pub button_speed: f64,
    /// Increase button binding.
    #[serde(default, alias = "increaseButton", deserialize_with = "migrate_binding")]
    pub button_add: InputBinding,
    /// Decrease button binding.
    #[serde(default, alias = "decreaseButton", deserialize_with = "migrate_binding")]
    pub button_remove: InputBinding,
}

/// Saved motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorRecord {
    /// Motor index.
    #[serde(alias = "address")]
    pub index: usize,
    /// Operator label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// PWM value; written rounded.
    #[serde(default = "default_pwm", serialize_with = "as_integer")]
    pub pwm: f64,
    /// Lower bound.
    #[serde(default = "default_min", serialize_with = "as_integer")]
    pub min: f64,
    /// Upper bound.
    #[serde(default = "default_max", serialize_with = "as_integer")]
    pub max: f64,
    /// Axis binding.
    #[serde(default, deserialize_with = "migrate_binding")]
    pub axis: AxisBinding,
}

/// Servo binding as saved: `{ "gamepadIndex", "inputIndex" }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBinding {
    /// Gamepad slot, or null.
    #[serde(default)]
    pub gamepad_index: Option<usize>,
    /// Axis or button index, or null.
    #[serde(default, alias = "axisIndex")]
    pub input_index: Option<usize>,
}

/// Motor binding as saved: `{ "gamepadIndex", "axisIndex" }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisBinding {
    /// Gamepad slot, or null.
    #[serde(default)]
    pub gamepad_index: Option<usize>,
    /// Axis index, or null.
    #[serde(default, alias = "inputIndex")]
    pub axis_index: Option<usize>,
}

impl From<Binding> for InputBinding {
    fn from(binding: Binding) -> Self {
        Self {
            gamepad_index: binding.gamepad(),
            input_index: binding.input(),
        }
    }
}

impl From<InputBinding> for Binding {
    fn from(record: InputBinding) -> Self {
        Binding::from_parts(record.gamepad_index, record.input_index)
    }
}

impl From<Binding> for AxisBinding {
    fn from(binding: Binding) -> Self {
        Self {
            gamepad_index: binding.gamepad(),
            axis_index: binding.input(),
        }
    }
}

impl From<AxisBinding> for Binding {
    fn from(record: AxisBinding) -> Self {
        Binding::from_parts(record.gamepad_index, record.axis_index)
    }
}

/// A binding as found in current or older files.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBinding<T> {
    Pair(T),
    /// Single-gamepad files stored only the input index.
    Input(usize),
}

fn migrate_binding<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default + From<Binding>,
{
    Ok(match Option::<StoredBinding<T>>::deserialize(deserializer)? {
        Some(StoredBinding::Pair(pair)) => pair,
        Some(StoredBinding::Input(input)) => T::from(Binding::Input { gamepad: 0, input }),
        None => T::default(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn as_integer<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.round() as i64)
}

fn default_pwm() -> f64 {
    PWM_CENTER
}

fn default_min() -> f64 {
    f64::from(PWM_MIN)
}

fn default_max() -> f64 {
    f64::from(PWM_MAX)
}

fn default_axis_speed() -> f64 {
    DEFAULT_AXIS_SPEED
}

fn default_button_speed() -> f64 {
    DEFAULT_BUTTON_SPEED
}

/// Bound from a saved number, clamped into 0-255.
fn saved_bound(value: f64) -> u8 {
    if value.is_nan() {
        return PWM_MIN;
    }
    clamp_bound(value.round() as i64)
}

impl From<&Servo> for ServoRecord {
    fn from(servo: &Servo) -> Self {
        Self {
            index: servo.index(),
            name: servo.name.clone(),
            pwm: f64::from(servo.channel.rounded()),
            min: f64::from(servo.channel.min()),
            max: f64::from(servo.channel.max()),
            axis_speed: servo.axis_speed,
            axis: servo.axis.into(),
            button_speed: servo.button_speed,
            button_add: servo.increase.into(),
            button_remove: servo.decrease.into(),
        }
    }
}

impl ServoRecord {
    fn into_servo(self) -> Servo {
        let mut servo = Servo::with_index(self.index);
        servo.name = self.name;
        servo.channel.set_min(saved_bound(self.min));
        servo.channel.set_max(saved_bound(self.max));
        servo.channel.set_value(self.pwm);
        servo.axis_speed = self.axis_speed;
        servo.button_speed = self.button_speed;
        servo.axis = self.axis.into();
        servo.increase = self.button_add.into();
        servo.decrease = self.button_remove.into();
        servo
    }
}

impl From<&Motor> for MotorRecord {
    fn from(motor: &Motor) -> Self {
        Self {
            index: motor.index(),
            name: motor.name.clone(),
            pwm: f64::from(motor.channel.rounded()),
            min: f64::from(motor.channel.min()),
            max: f64::from(motor.channel.max()),
            axis: motor.axis.into(),
        }
    }
}

impl MotorRecord {
    fn into_motor(self) -> Motor {
        let mut motor = Motor::with_index(self.index);
        motor.name = self.name;
        motor.channel.set_min(saved_bound(self.min));
        motor.channel.set_max(saved_bound(self.max));
        motor.channel.set_value(self.pwm);
        motor.axis = self.axis.into();
        motor
    }
}

impl From<&GamepadOverlay> for GamepadRecord {
    fn from(overlay: &GamepadOverlay) -> Self {
        Self {
            index: overlay.index,
            name: overlay.name.clone(),
            buttons: overlay.buttons.clone(),
            axes: overlay.axes.clone(),
        }
    }
}

impl From<GamepadRecord> for GamepadOverlay {
    fn from(record: GamepadRecord) -> Self {
        Self {
            index: record.index,
            name: record.name,
            buttons: record.buttons,
            axes: record.axes,
        }
    }
}

/// Configuration rebuilt from a save file, ready to replace the panel's.
///
/// The collections are fresh, so their index allocation starts after the
/// highest loaded index.
#[derive(Debug, Clone, Default)]
pub struct LoadedState {
    /// Servos with their saved indices.
    pub servos: ActuatorSet<Servo>,
    /// Motors with their saved indices.
    pub motors: ActuatorSet<Motor>,
    /// Gamepad overlays.
    pub overlays: Vec<GamepadOverlay>,
}

impl SaveFile {
    /// Captures the current configuration.
    pub fn capture<'a>(
        servos: &ActuatorSet<Servo>,
        motors: &ActuatorSet<Motor>,
        overlays: impl IntoIterator<Item = &'a GamepadOverlay>,
    ) -> Self {
        Self {
            gamepads: overlays.into_iter().map(GamepadRecord::from).collect(),
            servos: servos.iter().map(ServoRecord::from).collect(),
            motors: motors.iter().map(MotorRecord::from).collect(),
        }
    }

    /// Parses a save file.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the text is not a valid save file.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialises with 4-space indentation.
    ///
    /// # Errors
    ///
    /// Returns `Json` if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buffer)
            .map_err(|e| ArmControllerError::InvalidSaveFile(e.to_string()))
    }

    /// Builds the actuator collections and overlays this file describes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSaveFile` if two servos or two motors share an index, or
    /// an index is out of range.
    pub fn into_state(self) -> Result<LoadedState> {
        let mut state = LoadedState::default();
        for record in self.servos {
            state.servos.insert(record.into_servo())?;
        }
        for record in self.motors {
            state.motors.insert(record.into_motor())?;
        }
        state.overlays = self.gamepads.into_iter().map(GamepadOverlay::from).collect();
        Ok(state)
    }
}

/// Checks that a path is declared as a JSON save file.
///
/// # Errors
///
/// Returns `NotJsonSaveFile` unless the extension is `.json` (any case).
pub fn check_save_path(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(())
    } else {
        Err(ArmControllerError::NotJsonSaveFile(path.display().to_string()))
    }
}

/// Reads and validates a save file without touching any live state.
///
/// # Errors
///
/// * `NotJsonSaveFile` - wrong extension; the file is not opened
/// * `Io` - the file cannot be read
/// * `Json` - the content is not a save file
/// * `InvalidSaveFile` - duplicate or out-of-range indices
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<LoadedState> {
    let path = path.as_ref();
    check_save_path(path)?;

    let text = std::fs::read_to_string(path)?;
    let state = SaveFile::from_json(&text)?.into_state()?;

    info!(
        target: "operator",
        "Loaded {} servo(s), {} motor(s), {} gamepad(s) from {}",
        state.servos.len(),
        state.motors.len(),
        state.overlays.len(),
        path.display()
    );
    Ok(state)
}

/// Writes a save file.
///
/// # Errors
///
/// * `NotJsonSaveFile` - wrong extension
/// * `Io` - the file cannot be written
pub fn save_to_path<P: AsRef<Path>>(path: P, save: &SaveFile) -> Result<()> {
    let path = path.as_ref();
    check_save_path(path)?;

    let text = save.to_json_pretty()?;
    std::fs::write(path, &text)?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    info!(target: "operator", "Saved to {}", path.display());
    Ok(())
}
