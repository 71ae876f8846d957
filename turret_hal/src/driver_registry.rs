//! Driver registry for actuator drivers.
//!
//! Constructed at startup and passed by value; no global state.

use std::collections::HashMap;

use turret_common::hal::driver::{ActuatorDriver, DriverFactory, HalError};

/// Registry of available actuator drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in driver.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        // Names are distinct, registration cannot collide.
        let _ = reg.register("simulation", crate::drivers::simulation::create_driver);
        reg
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// Returns `HalError::DuplicateDriver` if the name is taken.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), HalError> {
        if self.factories.contains_key(name) {
            return Err(HalError::DuplicateDriver(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn ActuatorDriver>, HalError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
