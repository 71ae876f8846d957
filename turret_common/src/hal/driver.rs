//! Actuator driver trait and error types.

use thiserror::Error;

use crate::control_unit::config::TurretConfig;
use crate::hal::types::ActuationFrame;

/// Error types for driver operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Hardware rejected or failed to accept output
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Output requested before `init()` or after `shutdown()`
    #[error("Driver not initialized: {0}")]
    NotInitialized(&'static str),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Two factories registered under one name
    #[error("Driver already registered: {0}")]
    DuplicateDriver(&'static str),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn ActuatorDriver>;

/// Interface for pluggable actuator backends (simulation, GPIO, serial bridge).
///
/// # Lifecycle
///
/// 1. `init()` - Called once before the tick loop starts
/// 2. `apply()` - Called once per tick with that tick's output
/// 3. `shutdown()` - Called after the loop stops; must leave actuators de-energized
pub trait ActuatorDriver: Send {
    /// Driver identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Prepare hardware for the given configuration.
    fn init(&mut self, config: &TurretConfig) -> Result<(), HalError>;

    /// Write one tick of output. Must not block.
    fn apply(&mut self, frame: &ActuationFrame) -> Result<(), HalError>;

    /// De-energize all outputs and release resources.
    fn shutdown(&mut self) -> Result<(), HalError>;
}
