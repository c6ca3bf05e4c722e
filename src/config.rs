//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every key has a default, so an empty file (or no file at all) gives a
//! working panel that talks to a bridge on `localhost:8765`.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::engine::DEFAULT_AXIS_DEADZONE;
use crate::controller::evdev_pads::DEFAULT_DEVICE_DIR;
use crate::error::{ArmControllerError, Result};
use crate::link::protocol::{DEFAULT_HOST, DEFAULT_PORT};
use crate::persistence::DEFAULT_SAVE_PATH;
use crate::serial::DEFAULT_BAUD_RATE;

/// Configuration file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Baud rates the bridge accepts.
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Log levels accepted in `[logging]`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bridge endpoint the panel connects to
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub auto_connect: bool,
}

/// Gamepad sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    #[serde(default = "default_device_dir")]
    pub device_dir: String,

    /// Servo axis deadzone; motors use a quarter of it.
    #[serde(default = "default_axis_deadzone")]
    pub axis_deadzone: f32,

    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,
}

/// Save file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_save_path")]
    pub save_path: String,

    #[serde(default)]
    pub load_on_start: bool,
}

/// Serial bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_host")]
    pub listen_host: String,

    #[serde(default = "default_port")]
    pub listen_port: u16,

    #[serde(default = "default_messages_per_second")]
    pub messages_per_second: u32,

    #[serde(default)]
    pub forward_motors: bool,

    #[serde(default = "default_serial_idle_timeout_ms")]
    pub serial_idle_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to the console only.
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }

fn default_device_dir() -> String { DEFAULT_DEVICE_DIR.to_string() }
fn default_axis_deadzone() -> f32 { DEFAULT_AXIS_DEADZONE }
fn default_frame_rate_hz() -> u32 { 60 }
fn default_rescan_interval_ms() -> u64 { 1000 }

fn default_save_path() -> String { DEFAULT_SAVE_PATH.to_string() }

fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_messages_per_second() -> u32 { 50 }
fn default_serial_idle_timeout_ms() -> u64 { 1000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auto_connect: false,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            axis_deadzone: default_axis_deadzone(),
            frame_rate_hz: default_frame_rate_hz(),
            rescan_interval_ms: default_rescan_interval_ms(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            load_on_start: false,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            listen_host: default_host(),
            listen_port: default_port(),
            messages_per_second: default_messages_per_second(),
            forward_motors: false,
            serial_idle_timeout_ms: default_serial_idle_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> ArmControllerError {
    ArmControllerError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robot_arm_controller::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Returns `Config` if parsing or validation fails.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named on the command line, or the default file
    ///
    /// Without an explicit path, a missing default file yields the built-in
    /// defaults. An explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns error if the chosen file cannot be read or is invalid.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate server configuration
        if self.server.host.is_empty() {
            return Err(invalid("server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(invalid("server port cannot be 0"));
        }

        // Validate controller configuration
        if self.controller.device_dir.is_empty() {
            return Err(invalid("controller device_dir cannot be empty"));
        }

        if !(0.0..=0.5).contains(&self.controller.axis_deadzone) {
            return Err(invalid("axis_deadzone must be between 0.0 and 0.5"));
        }

        if self.controller.frame_rate_hz == 0 || self.controller.frame_rate_hz > 240 {
            return Err(invalid("frame_rate_hz must be between 1 and 240"));
        }

        if self.controller.rescan_interval_ms == 0 || self.controller.rescan_interval_ms > 60000 {
            return Err(invalid("rescan_interval_ms must be between 1 and 60000"));
        }

        // Validate persistence configuration
        if self.persistence.save_path.is_empty() {
            return Err(invalid("save_path cannot be empty"));
        }

        // Validate bridge configuration
        if self.bridge.serial_port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.bridge.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if self.bridge.listen_host.is_empty() {
            return Err(invalid("bridge listen_host cannot be empty"));
        }

        if self.bridge.listen_port == 0 {
            return Err(invalid("bridge listen_port cannot be 0"));
        }

        if self.bridge.messages_per_second == 0 || self.bridge.messages_per_second > 1000 {
            return Err(invalid("messages_per_second must be between 1 and 1000"));
        }

        if self.bridge.serial_idle_timeout_ms == 0 || self.bridge.serial_idle_timeout_ms > 60000 {
            return Err(invalid("serial_idle_timeout_ms must be between 1 and 60000"));
        }

        // Validate logging configuration
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                auto_connect: false,
            },
            controller: ControllerConfig {
                device_dir: default_device_dir(),
                axis_deadzone: default_axis_deadzone(),
                frame_rate_hz: default_frame_rate_hz(),
                rescan_interval_ms: default_rescan_interval_ms(),
            },
            persistence: PersistenceConfig {
                save_path: default_save_path(),
                load_on_start: false,
            },
            bridge: BridgeConfig {
                serial_port: default_serial_port(),
                baud_rate: default_baud_rate(),
                listen_host: default_host(),
                listen_port: default_port(),
                messages_per_second: default_messages_per_second(),
                forward_motors: false,
                serial_idle_timeout_ms: default_serial_idle_timeout_ms(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                directory: String::new(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 8765);
        assert_eq!(config.bridge.baud_rate, 19200);
        assert!(!config.bridge.forward_motors);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[server]
host = "192.168.1.20"
auto_connect = true

[controller]
axis_deadzone = 0.1

[bridge]
serial_port = "/dev/ttyUSB0"
forward_motors = true
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.server.host, "192.168.1.20");
        assert!(config.server.auto_connect);
        assert_eq!(config.controller.axis_deadzone, 0.1);
        assert_eq!(config.controller.frame_rate_hz, 60);
        assert_eq!(config.bridge.serial_port, "/dev/ttyUSB0");
        assert!(config.bridge.forward_motors);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = Config::load_or_default(Some(Path::new("/nonexistent/arm.toml")));
        assert!(matches!(result, Err(ArmControllerError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[server\nport = 1"),
            Err(ArmControllerError::Config(_))
        ));
    }

    #[test]
    fn test_empty_host() {
        let mut config = create_valid_config();
        config.server.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = create_valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_negative() {
        let mut config = create_valid_config();
        config.controller.axis_deadzone = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_too_high() {
        let mut config = create_valid_config();
        config.controller.axis_deadzone = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_rate_bounds() {
        let mut config = create_valid_config();
        config.controller.frame_rate_hz = 0;
        assert!(config.validate().is_err());
        config.controller.frame_rate_hz = 241;
        assert!(config.validate().is_err());
        config.controller.frame_rate_hz = 240;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rescan_interval_zero() {
        let mut config = create_valid_config();
        config.controller.rescan_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_save_path() {
        let mut config = create_valid_config();
        config.persistence.save_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.bridge.serial_port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.bridge.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.bridge.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_messages_per_second_bounds() {
        let mut config = create_valid_config();
        config.bridge.messages_per_second = 0;
        assert!(config.validate().is_err());
        config.bridge.messages_per_second = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_idle_timeout_too_high() {
        let mut config = create_valid_config();
        config.bridge.serial_idle_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host(), "localhost");
        assert_eq!(default_port(), 8765);
        assert_eq!(default_device_dir(), "/dev/input");
        assert_eq!(default_axis_deadzone(), 0.2);
        assert_eq!(default_frame_rate_hz(), 60);
        assert_eq!(default_rescan_interval_ms(), 1000);
        assert_eq!(default_save_path(), "save.json");
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 19200);
        assert_eq!(default_messages_per_second(), 50);
        assert_eq!(default_serial_idle_timeout_ms(), 1000);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn test_defaults_match_module_constants() {
        let config = Config::default();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.persistence.save_path, DEFAULT_SAVE_PATH);
        assert_eq!(config.controller.device_dir, DEFAULT_DEVICE_DIR);
        assert_eq!(config.controller.axis_deadzone, DEFAULT_AXIS_DEADZONE);
        assert_eq!(config.bridge.baud_rate, DEFAULT_BAUD_RATE);
    }
}
