//! Hardware-facing interfaces.
//!
//! - [`types`] - Per-tick actuation output
//! - [`driver`] - `ActuatorDriver` trait implemented by HAL backends
//! - [`channel`] - `ByteChannel` trait for the operator command link

pub mod channel;
pub mod driver;
pub mod types;
