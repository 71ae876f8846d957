//! Actuation output types.
//!
//! One [`ActuationFrame`] is produced per tick by the control unit and
//! handed to the active [`ActuatorDriver`](super::driver::ActuatorDriver).

use serde::{Deserialize, Serialize};

/// Stepper rotation sense. `Forward` increases the pan angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Forward,
    Reverse,
}

impl StepDirection {
    /// Sign of the angle change produced by one step.
    #[inline]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

/// Pulse burst for the pan stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    pub steps: u16,
    pub direction: StepDirection,
}

/// Tilt servo output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServoOutput {
    /// Hold position with the given pulse width [µs].
    Pulse(u16),
    /// No signal; servo is limp.
    #[default]
    Detached,
}

/// Everything written to hardware in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuationFrame {
    /// Steps to emit this tick, `None` when the axis holds.
    pub pan_steps: Option<StepCommand>,
    /// Stepper driver enable line.
    pub pan_enabled: bool,
    pub tilt: ServoOutput,
    /// Gated laser/fire output.
    pub fire: bool,
}

impl ActuationFrame {
    /// Output with every actuator de-energized.
    pub const HALTED: Self = Self {
        pan_steps: None,
        pan_enabled: false,
        tilt: ServoOutput::Detached,
        fire: false,
    };
}
