//! # Turret Control Unit Library
//!
//! Motion and targeting core for a two-axis pan/tilt pointing platform.
//! A fixed-period tick reads operator commands, evaluates the safety
//! interlock, updates target tracking, picks a desired pose from the tracker
//! or the scan generator, smooths both axes toward it and writes one
//! actuation frame to the driver.
//!
//! ## Tick Phases
//!
//! 1. **READ**: drain the byte channel, decode and dispatch commands
//! 2. **SAFETY**: staleness fail-safe, authority timeout
//! 3. **TRACK**: consume the latest detection frame, lock expiry
//! 4. **DESIRED**: tracker pose, scan pose or operator target
//! 5. **MOTION**: acceleration-limited axis update
//! 6. **WRITE**: fire gating, step/servo emission, telemetry

pub mod config;
pub mod cycle;
pub mod motion;
pub mod protocol;
pub mod safety;
pub mod scan;
pub mod tracking;
