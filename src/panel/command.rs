//! # Operator Commands
//!
//! One command per console line. Words are separated by whitespace; free
//! text (names and labels) takes the rest of the line.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `help` | List commands |
//! | `show` | Print the panel |
//! | `connect [host] [port]` | Connect to the bridge |
//! | `disconnect` | Close the connection |
//! | `add servo\|motor` | Add an actuator |
//! | `clear servos\|motors\|gamepads\|all` | Remove actuators or gamepad names |
//! | `name servo\|motor <i> <text>` | Rename an actuator |
//! | `set servo <i> pwm\|min\|max\|axis-speed\|button-speed <v>` | Change a servo value |
//! | `set motor <i> pwm\|min\|max <v>` | Change a motor value |
//! | `bind servo <i> axis\|increase\|decrease gamepad\|input <n\|none>` | Bind a servo role |
//! | `bind motor <i> axis gamepad\|input <n\|none>` | Bind the motor axis |
//! | `label gamepad <g> name <text>` | Name a gamepad |
//! | `label gamepad <g> axis\|button <n> <text>` | Name a gamepad input |
//! | `save [path]` | Write a save file |
//! | `load [path]` | Read a save file |
//! | `quit` | Exit |

use std::path::PathBuf;
use std::str::FromStr;

use crate::actuator::servo::ServoRole;
use crate::error::{ArmControllerError, Result};

/// Help text printed by `help`.
pub const HELP: &str = "\
Commands:
  help | show | quit
  connect [host] [port] | disconnect
  add servo|motor
  clear servos|motors|gamepads|all
  name servo|motor <i> <text>
  set servo <i> pwm|min|max|axis-speed|button-speed <value>
  set motor <i> pwm|min|max <value>
  bind servo <i> axis|increase|decrease gamepad|input <n|none>
  bind motor <i> axis gamepad|input <n|none>
  label gamepad <g> name <text>
  label gamepad <g> axis|button <n> <text>
  save [path] | load [path]";

/// Actuator class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    /// Servos.
    Servo,
    /// Motors.
    Motor,
}

/// What `clear` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    /// All servos.
    Servos,
    /// All motors.
    Motors,
    /// All gamepad names and labels.
    Gamepads,
    /// Everything.
    All,
}

/// Servo value changed by `set servo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoField {
    /// PWM value.
    Pwm,
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
    /// Axis speed.
    AxisSpeed,
    /// Button speed.
    ButtonSpeed,
}

/// Motor value changed by `set motor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorField {
    /// PWM value.
    Pwm,
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
}

/// Which half of a binding `bind` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTarget {
    /// Select a gamepad (`None` = unbind).
    Gamepad(Option<usize>),
    /// Select an input on the selected gamepad (`None` = clear input).
    Input(Option<usize>),
}

/// Which gamepad label `label` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadLabel {
    /// The gamepad itself.
    Name,
    /// An axis.
    Axis(usize),
    /// A button.
    Button(usize),
}

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the command list.
    Help,
    /// Print the panel.
    Show,
    /// Connect, optionally overriding the configured host and port.
    Connect {
        /// Host override.
        host: Option<String>,
        /// Port override.
        port: Option<u16>,
    },
    /// Close the connection.
    Disconnect,
    /// Add an actuator.
    Add(ActuatorKind),
    /// Remove actuators or overlays.
    Clear(ClearTarget),
    /// Rename an actuator.
    Name {
        /// Actuator class.
        kind: ActuatorKind,
        /// Actuator index.
        index: usize,
        /// New name; empty restores the placeholder.
        name: String,
    },
    /// Change a servo value.
    SetServo {
        /// Servo index.
        index: usize,
        /// Field to change.
        field: ServoField,
        /// New value.
        value: f64,
    },
    /// Change a motor value.
    SetMotor {
        /// Motor index.
        index: usize,
        /// Field to change.
        field: MotorField,
        /// New value.
        value: f64,
    },
    /// Change a servo binding.
    BindServo {
        /// Servo index.
        index: usize,
        /// Binding role.
        role: ServoRole,
        /// Change to make.
        target: BindTarget,
    },
    /// Change the motor axis binding.
    BindMotor {
        /// Motor index.
        index: usize,
        /// Change to make.
        target: BindTarget,
    },
    /// Name a gamepad or one of its inputs.
    Label {
        /// Gamepad slot.
        gamepad: usize,
        /// What to name.
        label: GamepadLabel,
        /// New text.
        text: String,
    },
    /// Write a save file.
    Save(Option<PathBuf>),
    /// Read a save file.
    Load(Option<PathBuf>),
    /// Exit.
    Quit,
}

impl FromStr for Command {
    type Err = ArmControllerError;

    /// Parses one console line.
    ///
    /// # Errors
    ///
    /// Returns `Command` describing the first word that could not be used.
    ///
    /// # Examples
    ///
    /// ```
    /// use robot_arm_controller::panel::command::{BindTarget, Command};
    /// use robot_arm_controller::actuator::servo::ServoRole;
    ///
    /// let command: Command = "bind servo 0 axis input 2".parse().unwrap();
    /// assert_eq!(command, Command::BindServo {
    ///     index: 0,
    ///     role: ServoRole::Axis,
    ///     target: BindTarget::Input(Some(2)),
    /// });
    /// ```
    fn from_str(line: &str) -> Result<Self> {
        let mut words = Words::new(line);

        let command = match words.next_word("command")? {
            "help" | "?" => Self::Help,
            "show" => Self::Show,
            "quit" | "exit" => Self::Quit,
            "disconnect" => Self::Disconnect,
            "connect" => {
                let host = words.next().map(str::to_string);
                let port = words.next().map(|p| parse_number::<u16>(p, "port")).transpose()?;
                Self::Connect { host, port }
            }
            "add" => Self::Add(words.kind()?),
            "clear" => Self::Clear(match words.next_word("what to clear")? {
                "servos" => ClearTarget::Servos,
                "motors" => ClearTarget::Motors,
                "gamepads" => ClearTarget::Gamepads,
                "all" => ClearTarget::All,
                other => return Err(unknown("clear target", other)),
            }),
            "name" => {
                let kind = words.kind()?;
                let index = words.number("index")?;
                Self::Name {
                    kind,
                    index,
                    name: words.rest(),
                }
            }
            "set" => match words.kind()? {
                ActuatorKind::Servo => {
                    let index = words.number("index")?;
                    let field = match words.next_word("field")? {
                        "pwm" => ServoField::Pwm,
                        "min" => ServoField::Min,
                        "max" => ServoField::Max,
                        "axis-speed" => ServoField::AxisSpeed,
                        "button-speed" => ServoField::ButtonSpeed,
                        other => return Err(unknown("servo field", other)),
                    };
                    let value = words.value()?;
                    Self::SetServo { index, field, value }
                }
                ActuatorKind::Motor => {
                    let index = words.number("index")?;
                    let field = match words.next_word("field")? {
                        "pwm" => MotorField::Pwm,
                        "min" => MotorField::Min,
                        "max" => MotorField::Max,
                        other => return Err(unknown("motor field", other)),
                    };
                    let value = words.value()?;
                    Self::SetMotor { index, field, value }
                }
            },
            "bind" => match words.kind()? {
                ActuatorKind::Servo => {
                    let index = words.number("index")?;
                    let role = match words.next_word("role")? {
                        "axis" => ServoRole::Axis,
                        "increase" => ServoRole::Increase,
                        "decrease" => ServoRole::Decrease,
                        other => return Err(unknown("servo role", other)),
                    };
                    let target = words.bind_target()?;
                    Self::BindServo { index, role, target }
                }
                ActuatorKind::Motor => {
                    let index = words.number("index")?;
                    match words.next_word("role")? {
                        "axis" => {}
                        other => return Err(unknown("motor role", other)),
                    }
                    let target = words.bind_target()?;
                    Self::BindMotor { index, target }
                }
            },
            "label" => {
                match words.next_word("gamepad")? {
                    "gamepad" => {}
                    other => return Err(unknown("label target", other)),
                }
                let gamepad = words.number("gamepad index")?;
                let label = match words.next_word("label kind")? {
                    "name" => GamepadLabel::Name,
                    "axis" => GamepadLabel::Axis(words.number("axis index")?),
                    "button" => GamepadLabel::Button(words.number("button index")?),
                    other => return Err(unknown("label kind", other)),
                };
                Self::Label {
                    gamepad,
                    label,
                    text: words.rest(),
                }
            }
            "save" => Self::Save(words.next().map(PathBuf::from)),
            "load" => Self::Load(words.next().map(PathBuf::from)),
            other => return Err(unknown("command", other)),
        };

        if let Some(extra) = words.next() {
            return Err(ArmControllerError::Command(format!(
                "Unexpected argument: {}",
                extra
            )));
        }

        Ok(command)
    }
}

/// Whitespace tokenizer that can hand back the rest of the line.
struct Words<'a> {
    rest: &'a str,
}

impl<'a> Words<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line.trim() }
    }

    fn next(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(word)
    }

    fn next_word(&mut self, what: &str) -> Result<&'a str> {
        self.next()
            .ok_or_else(|| ArmControllerError::Command(format!("Missing {}", what)))
    }

    /// Remainder of the line, trimmed; consumes it.
    fn rest(&mut self) -> String {
        let rest = self.rest.trim().to_string();
        self.rest = "";
        rest
    }

    fn kind(&mut self) -> Result<ActuatorKind> {
        match self.next_word("servo or motor")? {
            "servo" | "servos" => Ok(ActuatorKind::Servo),
            "motor" | "motors" => Ok(ActuatorKind::Motor),
            other => Err(unknown("actuator kind", other)),
        }
    }

    fn number<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let word = self.next_word(what)?;
        parse_number(word, what)
    }

    fn value(&mut self) -> Result<f64> {
        let value: f64 = self.number("value")?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ArmControllerError::Command(format!("Invalid value: {}", value)))
        }
    }

    fn optional_number(&mut self, what: &str) -> Result<Option<usize>> {
        match self.next_word(what)? {
            "none" | "-" => Ok(None),
            word => parse_number(word, what).map(Some),
        }
    }

    fn bind_target(&mut self) -> Result<BindTarget> {
        match self.next_word("gamepad or input")? {
            "gamepad" => Ok(BindTarget::Gamepad(self.optional_number("gamepad index")?)),
            "input" => Ok(BindTarget::Input(self.optional_number("input index")?)),
            other => Err(unknown("binding part", other)),
        }
    }
}

fn parse_number<T: FromStr>(word: &str, what: &str) -> Result<T> {
    word.parse()
        .map_err(|_| ArmControllerError::Command(format!("Invalid {}: {}", what, word)))
}

fn unknown(what: &str, word: &str) -> ArmControllerError {
    ArmControllerError::Command(format!("Unknown {}: {}", what, word))
}
