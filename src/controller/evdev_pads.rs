//! # Evdev Gamepad Module
//!
//! Detects gamepads through the Linux evdev interface and samples their
//! state once per frame.
//!
//! ## Detection
//!
//! Every `event*` node under the device directory is opened and kept when it
//! reports a gamepad face button (`BTN_SOUTH`) or a joystick trigger
//! (`BTN_TRIGGER`). Motion-sensor and touchpad nodes of the same controller
//! expose neither and are skipped.
//!
//! ## Slots
//!
//! Each detected gamepad takes the lowest free slot index. A device that
//! stops answering frees its slot, which the next connected gamepad reuses.
//!
//! ## Values
//!
//! - Axes: the kernel's `[minimum, maximum]` range scaled to -1.0..1.0
//! - Buttons: 1.0 while held, 0.0 otherwise

use evdev::{AbsoluteAxisType, Device, Key};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::snapshot::{GamepadEvent, GamepadSnapshot, GamepadSnapshots};
use super::GamepadSource;
use crate::error::{ArmControllerError, Result};

/// Default directory holding evdev nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// An opened gamepad device.
struct OpenGamepad {
    device: Device,
    path: PathBuf,
    name: String,
    axes: Vec<AbsoluteAxisType>,
    keys: Vec<Key>,
}

impl OpenGamepad {
    /// Reads the current axis and button state.
    fn read(&self, index: usize) -> std::io::Result<GamepadSnapshot> {
        let abs = self.device.get_abs_state()?;
        let key_state = self.device.get_key_state()?;

        let axes = self
            .axes
            .iter()
            .map(|axis| {
                let info = abs[axis.0 as usize];
                normalize_axis(info.value, info.minimum, info.maximum)
            })
            .collect();

        let buttons = self
            .keys
            .iter()
            .map(|key| if key_state.contains(*key) { 1.0 } else { 0.0 })
            .collect();

        Ok(GamepadSnapshot {
            index,
            name: self.name.clone(),
            axes,
            buttons,
        })
    }
}

/// Gamepads discovered through evdev.
pub struct EvdevGamepads {
    device_dir: PathBuf,
    rescan_interval: Duration,
    last_scan: Option<Instant>,
    slots: Vec<Option<OpenGamepad>>,
    events: Vec<GamepadEvent>,
}

impl std::fmt::Debug for EvdevGamepads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevGamepads")
            .field("device_dir", &self.device_dir)
            .field("connected", &self.connected_count())
            .finish_non_exhaustive()
    }
}

impl EvdevGamepads {
    /// Creates a source that scans `device_dir` every `rescan_interval`.
    ///
    /// No device is opened until the first [`sample`](GamepadSource::sample).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use robot_arm_controller::controller::GamepadSource;
    /// use robot_arm_controller::controller::evdev_pads::EvdevGamepads;
    ///
    /// let mut pads = EvdevGamepads::new("/dev/input", Duration::from_secs(1));
    /// let snapshots = pads.sample();
    /// for pad in snapshots.connected() {
    ///     println!("Gamepad {}: {}", pad.index, pad.name);
    /// }
    /// ```
    pub fn new<P: AsRef<Path>>(device_dir: P, rescan_interval: Duration) -> Self {
        Self {
            device_dir: device_dir.as_ref().to_path_buf(),
            rescan_interval,
            last_scan: None,
            slots: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Opens gamepads that appeared since the last scan.
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the device directory cannot be listed.
    pub fn rescan(&mut self) -> Result<()> {
        if !self.device_dir.exists() {
            return Err(ArmControllerError::Controller(format!(
                "{} directory not found",
                self.device_dir.display()
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(&self.device_dir)
            .map_err(|e| {
                ArmControllerError::Controller(format!(
                    "Failed to read {}: {}",
                    self.device_dir.display(),
                    e
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ArmControllerError::Controller(format!("Failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic slot assignment
        entries.sort_by_key(|entry| entry.path());

        let open_paths: HashSet<PathBuf> = self
            .slots
            .iter()
            .flatten()
            .map(|pad| pad.path.clone())
            .collect();

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node || open_paths.contains(&path) {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    if !is_gamepad(&device) {
                        continue;
                    }
                    let pad = Self::describe(device, path);
                    let slot = first_free_slot(&self.slots);
                    info!(
                        "Gamepad {} connected: {} ({} axes, {} buttons) at {}",
                        slot,
                        pad.name,
                        pad.axes.len(),
                        pad.keys.len(),
                        pad.path.display()
                    );
                    if slot == self.slots.len() {
                        self.slots.push(Some(pad));
                    } else {
                        self.slots[slot] = Some(pad);
                    }
                    self.events.push(GamepadEvent::Connected(slot));
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Ok(())
    }

    /// Number of connected gamepads.
    pub fn connected_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    fn describe(device: Device, path: PathBuf) -> OpenGamepad {
        let name = device.name().unwrap_or("Unknown gamepad").to_string();
        let axes = device
            .supported_absolute_axes()
            .map(|axes| axes.iter().collect())
            .unwrap_or_default();
        let keys = device
            .supported_keys()
            .map(|keys| keys.iter().collect())
            .unwrap_or_default();

        OpenGamepad {
            device,
            path,
            name,
            axes,
            keys,
        }
    }

    fn rescan_due(&self, now: Instant) -> bool {
        self.last_scan
            .map(|last| now.duration_since(last) >= self.rescan_interval)
            .unwrap_or(true)
    }
}

impl GamepadSource for EvdevGamepads {
    fn sample(&mut self) -> GamepadSnapshots {
        let now = Instant::now();
        if self.rescan_due(now) {
            self.last_scan = Some(now);
            if let Err(e) = self.rescan() {
                debug!("Gamepad scan failed: {}", e);
            }
        }

        let mut snapshots = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let snapshot = match slot.as_ref().map(|pad| pad.read(index)) {
                Some(Ok(snapshot)) => Some(snapshot),
                Some(Err(e)) => {
                    warn!("Gamepad {} disconnected: {}", index, e);
                    *slot = None;
                    self.events.push(GamepadEvent::Disconnected(index));
                    None
                }
                None => None,
            };
            snapshots.push(snapshot);
        }

        GamepadSnapshots::from_slots(snapshots)
    }

    fn take_events(&mut self) -> Vec<GamepadEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Checks whether a device looks like a gamepad or joystick.
fn is_gamepad(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER))
        .unwrap_or(false)
}

/// Scales a raw axis value from `[minimum, maximum]` to -1.0..1.0.
///
/// Degenerate ranges read as 0.0.
fn normalize_axis(value: i32, minimum: i32, maximum: i32) -> f32 {
    if maximum <= minimum {
        return 0.0;
    }
    let span = f64::from(maximum) - f64::from(minimum);
    let scaled = (f64::from(value) - f64::from(minimum)) / span * 2.0 - 1.0;
    scaled.clamp(-1.0, 1.0) as f32
}

/// Lowest empty slot, or one past the end.
fn first_free_slot<T>(slots: &[Option<T>]) -> usize {
    slots
        .iter()
        .position(Option::is_none)
        .unwrap_or(slots.len())
}
