//! The RAM-seeded settings dictionary.
//!
//! An ordered key → scalar map seeded at boot. Writing a key first pushes
//! the value into the subsystem it targets (stepper registers, motion
//! scale, homing configuration) and only updates the stored value when the
//! push succeeds. Only keys present at bootstrap are writable.

use crate::hal::TmcPort;
use crate::motion::MotionCtl;
use crate::wirefeed::WireFeed;
use motion::AXIS_COUNT;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// The stepper register ports, indexed by motor number.
pub type TmcBank = Vec<Mutex<Box<dyn TmcPort>>>;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown setting")]
    UnknownKey,
    #[error("apply failed: {0}")]
    Apply(String),
}

/// Ordered settings dictionary with hardware push on write.
pub struct Settings {
    entries: Mutex<Vec<(&'static str, f32)>>,
    motion: Arc<MotionCtl>,
    wirefeed: Arc<WireFeed>,
    tmc: Arc<TmcBank>,
}

impl Settings {
    /// Seeds the dictionary with its boot defaults.
    pub fn new(motion: Arc<MotionCtl>, wirefeed: Arc<WireFeed>, tmc: Arc<TmcBank>) -> Self {
        let entries = vec![
            ("m.0.microstep", 32.0),
            ("m.0.current", 30.0),
            ("m.0.thresh", 2.0),
            ("m.0.unitsteps", 200.0),
            ("m.1.microstep", 32.0),
            ("m.1.current", 30.0),
            ("m.1.thresh", 2.0),
            ("m.1.unitsteps", 200.0),
            ("m.2.microstep", 32.0),
            ("m.2.current", 30.0),
            ("m.2.thresh", 2.0),
            ("m.2.unitsteps", 200.0),
            ("m.6.unitsteps", 200.0),
            ("home.0.origin", 0.0),
            ("home.0.side", 1.0),
            ("home.1.origin", 0.0),
            ("home.1.side", 1.0),
            ("home.2.origin", 0.0),
            ("home.2.side", 1.0),
        ];
        Self {
            entries: Mutex::new(entries),
            motion,
            wirefeed,
            tmc,
        }
    }

    /// Applies and stores one setting.
    pub fn set(&self, key: &str, value: f32) -> Result<(), SettingsError> {
        let mut entries = self.entries.lock();
        let index = entries
            .iter()
            .position(|(k, _)| *k == key)
            .ok_or(SettingsError::UnknownKey)?;
        self.apply(key, value)?;
        entries[index].1 = value;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.entries
            .lock()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// All entries in seed order.
    pub fn list(&self) -> Vec<(&'static str, f32)> {
        self.entries.lock().clone()
    }

    /// Pushes every stored value into its subsystem (boot).
    pub fn apply_all(&self) {
        for (key, value) in self.entries.lock().iter() {
            if let Err(e) = self.apply(key, *value) {
                warn!(key, %e, "failed to apply setting");
            }
        }
    }

    fn apply(&self, key: &str, value: f32) -> Result<(), SettingsError> {
        let mut parts = key.split('.');
        let (group, index, field) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(index), Some(field), None) => (group, index, field),
            _ => return Err(SettingsError::UnknownKey),
        };
        let index: usize = index.parse().map_err(|_| SettingsError::UnknownKey)?;

        match group {
            "m" => self.apply_motor(index, field, value),
            "home" => self.apply_home(index, field, value),
            _ => Err(SettingsError::UnknownKey),
        }
    }

    fn apply_motor(&self, motor: usize, field: &str, value: f32) -> Result<(), SettingsError> {
        match field {
            "unitsteps" => {
                if motor < AXIS_COUNT {
                    self.motion.set_unitsteps(motor, value);
                    Ok(())
                } else if motor == crate::wirefeed::WIREFEED_MOTOR {
                    self.wirefeed.set_unitsteps(value);
                    Ok(())
                } else {
                    Err(SettingsError::UnknownKey)
                }
            }
            "microstep" | "current" | "thresh" => {
                let port = self.tmc.get(motor).ok_or(SettingsError::UnknownKey)?;
                let mut port = port.lock();
                let result = match field {
                    "microstep" => port.set_microstep(value as u32),
                    "current" => port.set_current(value as u8, 0),
                    _ => port.set_stallguard_threshold(value as u8),
                };
                result.map_err(|e| SettingsError::Apply(e.to_string()))
            }
            _ => Err(SettingsError::UnknownKey),
        }
    }

    fn apply_home(&self, axis: usize, field: &str, value: f32) -> Result<(), SettingsError> {
        if axis >= AXIS_COUNT {
            return Err(SettingsError::UnknownKey);
        }
        match field {
            "origin" => {
                self.motion.set_home_origin(axis, value);
                Ok(())
            }
            "side" => {
                self.motion.set_home_side(axis, value);
                Ok(())
            }
            _ => Err(SettingsError::UnknownKey),
        }
    }
}
