//! Simulation driver.
//!
//! `SimulatedTurret` integrates step pulses into a shaft position, decodes
//! servo pulse widths back into a tilt angle and latches the laser line.
//! A cloneable [`SimHandle`] exposes the simulated hardware to tests and
//! diagnostics after the driver has been boxed.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use turret_common::prelude::*;

/// Simulated hardware state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedState {
    /// Set between `init()` and `shutdown()`.
    pub initialized: bool,
    /// Net step count since init; zero is the pan lower bound.
    pub step_position: i64,
    /// Stepper driver enable line.
    pub stepper_enabled: bool,
    /// Last servo pulse width, `None` while detached.
    pub servo_pulse_us: Option<u16>,
    /// Laser output line.
    pub laser: bool,
    /// Frames accepted by `apply()`.
    pub frames_applied: u64,
    /// Frames applied with the laser on.
    pub laser_on_frames: u64,
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    pan_min: f64,
    step_angle: f64,
    tilt_min: f64,
    tilt_max: f64,
    pulse_min_us: u16,
    pulse_max_us: u16,
}

impl Geometry {
    fn from_config(config: &TurretConfig) -> Self {
        Self {
            pan_min: config.pan.min_angle,
            step_angle: config.pan.step_angle(),
            tilt_min: config.tilt.min_angle,
            tilt_max: config.tilt.max_angle,
            pulse_min_us: config.tilt.pulse_min_us,
            pulse_max_us: config.tilt.pulse_max_us,
        }
    }
}

/// Shared read access to a [`SimulatedTurret`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimulatedState>>,
    geometry: Arc<Mutex<Option<Geometry>>>,
}

impl SimHandle {
    /// Copy of the current simulated state.
    pub fn snapshot(&self) -> SimulatedState {
        self.state.lock().clone()
    }

    /// Shaft pan angle implied by the emitted steps [deg].
    pub fn pan_angle(&self) -> Option<f64> {
        let geo = (*self.geometry.lock())?;
        let steps = self.state.lock().step_position;
        Some(geo.pan_min + steps as f64 * geo.step_angle)
    }

    /// Tilt angle implied by the servo pulse width [deg], `None` while detached.
    pub fn tilt_angle(&self) -> Option<f64> {
        let geo = (*self.geometry.lock())?;
        let pulse = self.state.lock().servo_pulse_us?;
        let frac = f64::from(pulse.saturating_sub(geo.pulse_min_us))
            / f64::from(geo.pulse_max_us - geo.pulse_min_us);
        Some(geo.tilt_min + frac * (geo.tilt_max - geo.tilt_min))
    }
}

/// Simulation driver implementing `ActuatorDriver`.
pub struct SimulatedTurret {
    state: Arc<Mutex<SimulatedState>>,
    geometry: Arc<Mutex<Option<Geometry>>>,
}

impl SimulatedTurret {
    /// Create an uninitialized simulated turret.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState::default())),
            geometry: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for observing the simulated hardware.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
            geometry: Arc::clone(&self.geometry),
        }
    }
}

impl Default for SimulatedTurret {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorDriver for SimulatedTurret {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init(&mut self, config: &TurretConfig) -> Result<(), HalError> {
        let geo = Geometry::from_config(config);
        if geo.pulse_max_us <= geo.pulse_min_us {
            return Err(HalError::InitFailed(format!(
                "servo pulse range {}..{} is empty",
                geo.pulse_min_us, geo.pulse_max_us
            )));
        }
        *self.geometry.lock() = Some(geo);
        *self.state.lock() = SimulatedState {
            initialized: true,
            ..SimulatedState::default()
        };
        info!(
            "Simulation driver initialized (step angle {:.3}°, servo {}..{} µs)",
            geo.step_angle, geo.pulse_min_us, geo.pulse_max_us
        );
        Ok(())
    }

    fn apply(&mut self, frame: &ActuationFrame) -> Result<(), HalError> {
        let mut st = self.state.lock();
        if !st.initialized {
            return Err(HalError::NotInitialized("simulation"));
        }

        if st.stepper_enabled != frame.pan_enabled {
            debug!("Stepper driver {}", if frame.pan_enabled { "enabled" } else { "disabled" });
            st.stepper_enabled = frame.pan_enabled;
        }

        if let Some(cmd) = frame.pan_steps {
            if !st.stepper_enabled {
                warn!("Dropped {} steps: stepper disabled", cmd.steps);
                return Err(HalError::CommunicationError(
                    "step pulses while stepper disabled".to_string(),
                ));
            }
            st.step_position += i64::from(cmd.steps) * cmd.direction.sign() as i64;
        }

        st.servo_pulse_us = match frame.tilt {
            ServoOutput::Pulse(us) => Some(us),
            ServoOutput::Detached => None,
        };

        if st.laser != frame.fire {
            debug!("Laser {}", if frame.fire { "ON" } else { "OFF" });
            st.laser = frame.fire;
        }
        if st.laser {
            st.laser_on_frames += 1;
        }
        st.frames_applied += 1;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        let mut st = self.state.lock();
        st.laser = false;
        st.stepper_enabled = false;
        st.servo_pulse_us = None;
        st.initialized = false;
        info!(
            "Simulation driver shut down after {} frames (laser on for {})",
            st.frames_applied, st.laser_on_frames
        );
        Ok(())
    }
}

/// Factory registered under `"simulation"`.
pub fn create_driver() -> Box<dyn ActuatorDriver> {
    Box::new(SimulatedTurret::new())
}
