//! Actuator driver implementations.
//!
//! - [`simulation`] - Software stand-in for the stepper, servo and laser

pub mod simulation;
