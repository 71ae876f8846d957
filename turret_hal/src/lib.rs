//! # Turret HAL Library
//!
//! Hardware abstraction for the pan/tilt platform.
//!
//! Drivers implement the `ActuatorDriver` trait and command links implement
//! the `ByteChannel` trait, both defined in `turret_common::hal`.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`channel`] - Byte channel implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  ActuationFrame   ┌─────────────────────┐
//! │  turret_control_unit │ ────────────────► │  ActuatorDriver     │
//! │  (tick loop)         │                   │  (simulation, ...)  │
//! │                      │ ◄──── bytes ───── │  ByteChannel        │
//! └──────────────────────┘ ───── replies ──► │  (stream, loopback) │
//!                                            └─────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod channel;
pub mod driver_registry;
pub mod drivers;
