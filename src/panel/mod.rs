//! # Panel Module
//!
//! The control panel application: actuator collections, gamepad overlays,
//! the PWM engine, the bridge connection and the view, driven one frame at
//! a time.
//!
//! ## Frame Order
//!
//! Every [`Panel::tick`] runs these steps in this order, so the snapshot sent
//! to the bridge always reflects this frame's input:
//!
//! 1. Sample all gamepads
//! 2. Apply gamepad connect/disconnect events to the overlays
//! 3. Update every servo, then every motor
//! 4. Refresh the view
//! 5. Send the PWM snapshot (dropped while disconnected)
//!
//! Operator commands run between frames on the same task.

pub mod command;
pub mod view;

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::actuator::{clamp_bound, Actuator, ActuatorSet, Motor, Servo};
use crate::config::Config;
use crate::controller::engine::PwmEngine;
use crate::controller::overlay::{check_label_index, GamepadOverlays};
use crate::controller::snapshot::{GamepadEvent, GamepadSnapshots};
use crate::controller::GamepadSource;
use crate::error::{ArmControllerError, Result};
use crate::link::protocol::PwmSnapshot;
use crate::persistence::{self, SaveFile};
use crate::transport::{ConnectionEvent, ServerConnection};

use command::{
    ActuatorKind, BindTarget, ClearTarget, Command, GamepadLabel, MotorField, ServoField, HELP,
};
use view::PanelView;

/// Result of running an operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Nothing to print.
    Done,
    /// Text for the operator.
    Output(String),
    /// The operator asked to exit.
    Quit,
}

/// The control panel.
pub struct Panel<S: GamepadSource> {
    source: S,
    engine: PwmEngine,
    connection: ServerConnection,
    servos: ActuatorSet<Servo>,
    motors: ActuatorSet<Motor>,
    overlays: GamepadOverlays,
    gamepads: GamepadSnapshots,
    view: PanelView,
    last_frame: Option<Instant>,
    host: String,
    port: u16,
    save_path: PathBuf,
}

impl<S: GamepadSource> std::fmt::Debug for Panel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("servos", &self.servos.len())
            .field("motors", &self.motors.len())
            .field("connection", &self.connection.state())
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl<S: GamepadSource> Panel<S> {
    /// Creates an empty panel.
    ///
    /// # Arguments
    ///
    /// * `source` - gamepad sampler
    /// * `connection` - bridge connection (its event receiver stays with the caller)
    /// * `config` - deadzone, bridge address and save path
    pub fn new(source: S, connection: ServerConnection, config: &Config) -> Self {
        Self {
            source,
            engine: PwmEngine::new(config.controller.axis_deadzone),
            connection,
            servos: ActuatorSet::new(),
            motors: ActuatorSet::new(),
            overlays: GamepadOverlays::new(),
            gamepads: GamepadSnapshots::new(),
            view: PanelView::new(),
            last_frame: None,
            host: config.server.host.clone(),
            port: config.server.port,
            save_path: PathBuf::from(&config.persistence.save_path),
        }
    }

    /// Runs one frame.
    ///
    /// The first frame only samples; later frames integrate input over the
    /// time since the previous frame.
    pub fn tick(&mut self, now: Instant) {
        self.gamepads = self.source.sample();

        for event in self.source.take_events() {
            self.apply_gamepad_event(event);
        }

        let delta_ms = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        self.engine
            .apply_all(&mut self.servos, &mut self.motors, &self.gamepads, delta_ms);

        self.refresh_view();

        self.connection.send(&self.snapshot());
    }

    fn apply_gamepad_event(&mut self, event: GamepadEvent) {
        match event {
            GamepadEvent::Connected(index) => {
                if let Some(pad) = self.gamepads.get(index) {
                    self.overlays.ensure(pad);
                    info!(
                        target: "operator",
                        "Gamepad {} connected: {}",
                        index,
                        self.overlays.gamepad_label(index, Some(&pad.name))
                    );
                }
            }
            GamepadEvent::Disconnected(index) => {
                info!(target: "operator", "Gamepad {} disconnected", index);
            }
        }
    }

    fn refresh_view(&mut self) {
        self.view.refresh(
            &self.servos,
            &self.motors,
            &self.gamepads,
            &self.overlays,
            self.connection.state(),
        );
    }

    /// Rounded PWM value of every actuator, keyed by index.
    pub fn snapshot(&self) -> PwmSnapshot {
        let mut snapshot = PwmSnapshot::default();
        for servo in self.servos.iter() {
            snapshot.servos.insert(servo.index(), servo.channel.rounded());
        }
        for motor in self.motors.iter() {
            snapshot.motors.insert(motor.index(), motor.channel.rounded());
        }
        snapshot
    }

    /// Feeds a connection event from the socket task into the connection.
    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        self.connection.handle_event(event);
    }

    /// Connects to the bridge, replacing any existing connection.
    pub fn connect(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self.connection.connect(&self.host, self.port);
    }

    /// Writes the configuration to a save file.
    ///
    /// # Errors
    ///
    /// Returns `NotJsonSaveFile` or `Io` if the file cannot be written.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(self.save_path.as_path());
        let save = SaveFile::capture(&self.servos, &self.motors, self.overlays.iter());
        persistence::save_to_path(path, &save)
    }

    /// Replaces the configuration with a save file.
    ///
    /// Nothing changes unless the whole file is valid.
    ///
    /// # Errors
    ///
    /// Returns `NotJsonSaveFile`, `Io`, `Json` or `InvalidSaveFile`.
    pub fn load(&mut self, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(self.save_path.as_path());
        let state = persistence::load_from_path(path)?;

        self.servos = state.servos;
        self.motors = state.motors;
        self.overlays.replace(state.overlays);
        for pad in self.gamepads.connected() {
            self.overlays.ensure(pad);
        }
        self.refresh_view();
        Ok(())
    }

    /// Runs an operator command.
    ///
    /// # Errors
    ///
    /// Returns the error of the failed operation; state is unchanged.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome> {
        debug!("Executing {:?}", command);

        match command {
            Command::Help => return Ok(CommandOutcome::Output(HELP.to_string())),
            Command::Show => {
                self.refresh_view();
                return Ok(CommandOutcome::Output(self.view.render()));
            }
            Command::Quit => return Ok(CommandOutcome::Quit),
            Command::Connect { host, port } => self.connect(host, port),
            Command::Disconnect => self.connection.disconnect(),
            Command::Add(ActuatorKind::Servo) => {
                let servo = self.servos.add();
                info!(target: "operator", "Added {}", servo.display_name());
            }
            Command::Add(ActuatorKind::Motor) => {
                let motor = self.motors.add();
                info!(target: "operator", "Added {}", motor.display_name());
            }
            Command::Clear(target) => self.clear(target),
            Command::Name { kind, index, name } => match kind {
                ActuatorKind::Servo => self.servos.require_mut(index)?.name = name,
                ActuatorKind::Motor => self.motors.require_mut(index)?.name = name,
            },
            Command::SetServo { index, field, value } => {
                let servo = self.servos.require_mut(index)?;
                match field {
                    ServoField::Pwm => servo.channel.set_value(value),
                    ServoField::Min => servo.channel.set_min(clamp_bound(value.round() as i64)),
                    ServoField::Max => servo.channel.set_max(clamp_bound(value.round() as i64)),
                    ServoField::AxisSpeed => servo.axis_speed = value,
                    ServoField::ButtonSpeed => servo.button_speed = value,
                }
            }
            Command::SetMotor { index, field, value } => {
                let motor = self.motors.require_mut(index)?;
                match field {
                    MotorField::Pwm => motor.channel.set_value(value),
                    MotorField::Min => motor.channel.set_min(clamp_bound(value.round() as i64)),
                    MotorField::Max => motor.channel.set_max(clamp_bound(value.round() as i64)),
                }
            }
            Command::BindServo { index, role, target } => {
                let binding = self.servos.require_mut(index)?.binding_mut(role);
                match target {
                    BindTarget::Gamepad(gamepad) => binding.select_gamepad(gamepad),
                    BindTarget::Input(input) => binding.select_input(input)?,
                }
            }
            Command::BindMotor { index, target } => {
                let binding = &mut self.motors.require_mut(index)?.axis;
                match target {
                    BindTarget::Gamepad(gamepad) => binding.select_gamepad(gamepad),
                    BindTarget::Input(input) => binding.select_input(input)?,
                }
            }
            Command::Label { gamepad, label, text } => {
                if let GamepadLabel::Axis(index) | GamepadLabel::Button(index) = label {
                    check_label_index(index)?;
                }
                let overlay = self.overlays.get_or_create(gamepad);
                match label {
                    GamepadLabel::Name => overlay.name = text,
                    GamepadLabel::Axis(axis) => overlay.set_axis_label(axis, &text)?,
                    GamepadLabel::Button(button) => overlay.set_button_label(button, &text)?,
                }
            }
            Command::Save(path) => self.save(path.as_deref())?,
            Command::Load(path) => self.load(path.as_deref())?,
        }

        self.refresh_view();
        Ok(CommandOutcome::Done)
    }

    fn clear(&mut self, target: ClearTarget) {
        if matches!(target, ClearTarget::Servos | ClearTarget::All) {
            self.servos.clear();
        }
        if matches!(target, ClearTarget::Motors | ClearTarget::All) {
            self.motors.clear();
        }
        if matches!(target, ClearTarget::Gamepads | ClearTarget::All) {
            self.overlays.clear();
            for pad in self.gamepads.connected() {
                self.overlays.ensure(pad);
            }
        }
    }

    /// Parses and runs one console line.
    ///
    /// # Errors
    ///
    /// Returns `Command` for unparseable lines, otherwise as [`execute`](Self::execute).
    pub fn execute_line(&mut self, line: &str) -> Result<CommandOutcome> {
        let command: Command = line.parse()?;
        self.execute(command)
    }

    /// Servos.
    pub fn servos(&self) -> &ActuatorSet<Servo> {
        &self.servos
    }

    /// Servos, mutably.
    pub fn servos_mut(&mut self) -> &mut ActuatorSet<Servo> {
        &mut self.servos
    }

    /// Motors.
    pub fn motors(&self) -> &ActuatorSet<Motor> {
        &self.motors
    }

    /// Motors, mutably.
    pub fn motors_mut(&mut self) -> &mut ActuatorSet<Motor> {
        &mut self.motors
    }

    /// Gamepad overlays.
    pub fn overlays(&self) -> &GamepadOverlays {
        &self.overlays
    }

    /// The bridge connection.
    pub fn connection(&self) -> &ServerConnection {
        &self.connection
    }

    /// The view as of the last refresh.
    pub fn view(&self) -> &PanelView {
        &self.view
    }
}

/// Operator-facing text for an error.
pub fn describe_error(error: &ArmControllerError) -> String {
    match error {
        ArmControllerError::NotJsonSaveFile(_) => "Must be a .json savefile!".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Binding;
    use crate::controller::snapshot::GamepadSnapshot;
    use crate::controller::MockGamepadSource;
    use std::time::Duration;
    use tempfile::tempdir;

    fn pad(index: usize, axes: Vec<f32>, buttons: Vec<f32>) -> GamepadSnapshot {
        GamepadSnapshot {
            index,
            name: "Test Pad".to_string(),
            axes,
            buttons,
        }
    }

    /// Mock that always reports the same gamepads and no events.
    fn steady_source(slots: Vec<Option<GamepadSnapshot>>) -> MockGamepadSource {
        let mut source = MockGamepadSource::new();
        let snapshots = GamepadSnapshots::from_slots(slots);
        source.expect_sample().returning(move || snapshots.clone());
        source.expect_take_events().returning(Vec::new);
        source
    }

    fn panel_with(source: MockGamepadSource) -> Panel<MockGamepadSource> {
        let (connection, _events) = ServerConnection::logging();
        Panel::new(source, connection, &Config::default())
    }

    // ==================== Frame Tests ====================

    #[test]
    fn test_tick_moves_bound_servo() {
        let source = steady_source(vec![Some(pad(0, vec![0.0, 0.0, 0.5], vec![]))]);
        let mut panel = panel_with(source);
        panel.servos_mut().add().axis = Binding::Input { gamepad: 0, input: 2 };

        let start = Instant::now();
        panel.tick(start);
        assert_eq!(panel.servos().get(0).unwrap().channel.value(), 127.0);

        panel.tick(start + Duration::from_millis(100));
        let value = panel.servos().get(0).unwrap().channel.value();
        assert!((value - 132.0).abs() < 1e-6, "got {}", value);
        assert_eq!(panel.view().servos()[0].pwm, 132);
    }

    #[tokio::test]
    async fn test_tick_streams_snapshot_to_open_connection() {
        use futures::StreamExt;
        use tokio::net::TcpListener;
        use tokio::sync::mpsc;
        use tokio::time::timeout;
        use tokio_tungstenite::tungstenite::Message;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (received_tx, mut received) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    let _ = received_tx.send(text);
                }
            }
        });

        let source = steady_source(vec![Some(pad(0, vec![0.0, 0.0, 0.5], vec![]))]);
        let (connection, mut events) = ServerConnection::logging();
        let mut panel = Panel::new(source, connection, &Config::default());
        panel.servos_mut().add().axis = Binding::Input { gamepad: 0, input: 2 };

        panel.connect(Some("127.0.0.1".to_string()), Some(port));
        let opened = timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
        assert!(matches!(opened, ConnectionEvent::Opened { .. }));
        panel.handle_connection_event(opened);

        let start = Instant::now();
        panel.tick(start);
        panel.tick(start + Duration::from_millis(100));

        let first = timeout(Duration::from_secs(5), received.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(5), received.recv()).await.unwrap().unwrap();
        assert_eq!(first, r#"{"servos":{"0":127}}"#);
        assert_eq!(second, r#"{"servos":{"0":132}}"#);
    }

    #[test]
    fn test_tick_sets_motor_from_axis() {
        let source = steady_source(vec![Some(pad(0, vec![1.0], vec![]))]);
        let mut panel = panel_with(source);
        panel.motors_mut().add().axis = Binding::Input { gamepad: 0, input: 0 };

        panel.tick(Instant::now());

        assert_eq!(panel.snapshot().motors.get(&0), Some(&255));
    }

    #[test]
    fn test_tick_creates_overlay_on_connect() {
        let mut source = MockGamepadSource::new();
        let snapshots = GamepadSnapshots::from_slots(vec![None, Some(pad(1, vec![0.0; 6], vec![0.0; 13]))]);
        source.expect_sample().returning(move || snapshots.clone());
        let mut first = true;
        source.expect_take_events().returning(move || {
            if std::mem::take(&mut first) {
                vec![GamepadEvent::Connected(1)]
            } else {
                Vec::new()
            }
        });
        let mut panel = panel_with(source);

        panel.tick(Instant::now());

        let overlay = panel.overlays().get(1).unwrap();
        assert_eq!(overlay.axes.len(), 6);
        assert_eq!(overlay.buttons.len(), 13);
        assert_eq!(panel.view().gamepads()[0].label, "Test Pad");
    }

    #[test]
    fn test_tick_without_gamepads_keeps_values() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.servos_mut().add().axis = Binding::Input { gamepad: 0, input: 0 };

        let start = Instant::now();
        panel.tick(start);
        panel.tick(start + Duration::from_millis(500));

        assert_eq!(panel.snapshot().servos.get(&0), Some(&127));
    }

    #[test]
    fn test_snapshot_json() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.servos_mut().add().channel.set_value(130.0);
        panel.servos_mut().add().channel.set_value(64.2);
        assert_eq!(panel.snapshot().to_json().unwrap(), r#"{"servos":{"0":130,"1":64}}"#);
    }

    // ==================== Command Tests ====================

    #[test]
    fn test_add_and_clear_resets_indices() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add servo").unwrap();
        panel.execute_line("add servo").unwrap();
        assert_eq!(panel.servos().next_index(), 2);

        panel.execute_line("clear servos").unwrap();
        assert!(panel.servos().is_empty());
        panel.execute_line("add servo").unwrap();
        assert!(panel.servos().get(0).is_some());
    }

    #[test]
    fn test_set_bounds_never_invert() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add motor").unwrap();
        panel.execute_line("set motor 0 max 50").unwrap();
        panel.execute_line("set motor 0 min 80").unwrap();

        let channel = &panel.motors().get(0).unwrap().channel;
        assert_eq!(channel.min(), 80);
        assert_eq!(channel.max(), 80);
        assert_eq!(channel.rounded(), 80);
    }

    #[test]
    fn test_bind_gamepad_change_resets_input() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add servo").unwrap();
        panel.execute_line("bind servo 0 increase gamepad 0").unwrap();
        panel.execute_line("bind servo 0 increase input 5").unwrap();
        assert_eq!(
            panel.servos().get(0).unwrap().increase,
            Binding::Input { gamepad: 0, input: 5 }
        );

        panel.execute_line("bind servo 0 increase gamepad 1").unwrap();
        assert_eq!(
            panel.servos().get(0).unwrap().increase,
            Binding::Gamepad { gamepad: 1 }
        );
    }

    #[test]
    fn test_bind_input_without_gamepad_fails() {
        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add motor").unwrap();
        assert!(matches!(
            panel.execute_line("bind motor 0 axis input 1"),
            Err(ArmControllerError::NoGamepadSelected)
        ));
    }

    #[test]
    fn test_unknown_actuator() {
        let mut panel = panel_with(steady_source(Vec::new()));
        match panel.execute_line("set servo 4 pwm 10") {
            Err(ArmControllerError::UnknownActuator { kind, index }) => {
                assert_eq!(kind, "servo");
                assert_eq!(index, 4);
            }
            other => panic!("Expected UnknownActuator, got: {:?}", other),
        }
    }

    #[test]
    fn test_label_and_show() {
        let source = steady_source(vec![Some(pad(0, vec![0.0; 2], vec![0.0; 2]))]);
        let mut panel = panel_with(source);
        panel.tick(Instant::now());
        panel.execute_line("add servo").unwrap();
        panel.execute_line("name servo 0 Wrist").unwrap();
        panel.execute_line("bind servo 0 axis gamepad 0").unwrap();
        panel.execute_line("bind servo 0 axis input 1").unwrap();
        panel.execute_line("label gamepad 0 name Left hand").unwrap();
        panel.execute_line("label gamepad 0 axis 1 Stick Y").unwrap();

        match panel.execute_line("show").unwrap() {
            CommandOutcome::Output(text) => {
                assert!(text.contains("[0] Wrist"));
                assert!(text.contains("axis: Left hand / Stick Y"));
                assert!(text.contains("[0] Left hand  2 axes, 2 buttons"));
            }
            other => panic!("Expected output, got: {:?}", other),
        }
    }

    #[test]
    fn test_label_huge_index_rejected() {
        let mut panel = panel_with(steady_source(vec![]));

        assert!(matches!(
            panel.execute_line("label gamepad 3 axis 99999999999 Stick"),
            Err(ArmControllerError::Command(_))
        ));
        assert!(panel.execute_line("label gamepad 3 button 4096 Claw").is_err());
        assert!(panel.overlays.get(3).is_none());
    }

    #[test]
    fn test_quit_and_help() {
        let mut panel = panel_with(steady_source(Vec::new()));
        assert_eq!(panel.execute_line("quit").unwrap(), CommandOutcome::Quit);
        assert!(matches!(panel.execute_line("help").unwrap(), CommandOutcome::Output(_)));
    }

    // ==================== Save/Load Tests ====================

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arm.json");
        let path_text = path.display().to_string();

        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add servo").unwrap();
        panel.execute_line("add servo").unwrap();
        panel.execute_line("set servo 1 pwm 200.4").unwrap();
        panel.execute_line("add motor").unwrap();
        panel.execute_line(&format!("save {}", path_text)).unwrap();

        panel.execute_line("clear all").unwrap();
        panel.execute_line(&format!("load {}", path_text)).unwrap();

        assert_eq!(panel.servos().len(), 2);
        assert_eq!(panel.servos().get(1).unwrap().channel.rounded(), 200);
        assert_eq!(panel.motors().len(), 1);
        assert_eq!(panel.servos().next_index(), 2);
    }

    #[test]
    fn test_load_wrong_type_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("arm.txt");
        std::fs::write(&path, r#"{"servos":[]}"#).unwrap();

        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add servo").unwrap();
        panel.execute_line("set servo 0 pwm 10").unwrap();

        let result = panel.load(Some(&path));

        let error = result.unwrap_err();
        assert!(matches!(error, ArmControllerError::NotJsonSaveFile(_)));
        assert_eq!(describe_error(&error), "Must be a .json savefile!");
        assert_eq!(panel.servos().len(), 1);
        assert_eq!(panel.servos().get(0).unwrap().channel.rounded(), 10);
    }

    #[test]
    fn test_load_malformed_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut panel = panel_with(steady_source(Vec::new()));
        panel.execute_line("add motor").unwrap();

        assert!(panel.load(Some(&path)).is_err());
        assert_eq!(panel.motors().len(), 1);
    }

    #[test]
    fn test_load_adds_overlays_for_connected_gamepads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pads.json");
        std::fs::write(&path, r#"{"gamepads":[{"index":3,"name":"Old","buttons":[],"axes":[]}]}"#)
            .unwrap();

        let source = steady_source(vec![Some(pad(0, vec![0.0], vec![0.0]))]);
        let mut panel = panel_with(source);
        panel.tick(Instant::now());
        panel.load(Some(&path)).unwrap();

        assert_eq!(panel.overlays().get(3).unwrap().name, "Old");
        assert!(panel.overlays().get(0).is_some());
    }
}
