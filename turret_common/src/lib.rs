//! Turret Common Library
//!
//! Shared value types, constants and configuration for the pan/tilt
//! turret workspace crates.
//!
//! # Module Structure
//!
//! - [`types`] - Axis, pose and detection value types
//! - [`control_unit`] - Control unit configuration, modes and interlock flags
//! - [`hal`] - Actuator driver and command channel interfaces
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! turret_common = { workspace = true }
//! ```
//!
//! ```rust
//! use turret_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
pub mod types;
