//! System-wide constants for the turret workspace.
//!
//! Single source of truth for numeric limits and configuration defaults.
//! Imported by all crates; no duplication permitted.

use static_assertions::const_assert;

// ─── Cycle ──────────────────────────────────────────────────────────

/// Default tick period in milliseconds (100 Hz).
pub const CYCLE_TIME_MS: u32 = 10;
/// Minimum accepted tick period [ms].
pub const CYCLE_TIME_MS_MIN: u32 = 1;
/// Maximum accepted tick period [ms].
pub const CYCLE_TIME_MS_MAX: u32 = 100;

/// Default telemetry interval [ticks] (every 0.5 s at 10 ms).
pub const TELEMETRY_INTERVAL_DEFAULT: u32 = 50;

/// Maximum bytes drained from the command channel per tick.
pub const MAX_RX_BYTES_PER_TICK: usize = 256;

// ─── Axis Limits ────────────────────────────────────────────────────

/// Default pan (yaw, stepper) range [deg].
pub const PAN_MIN_DEFAULT: f64 = 0.0;
pub const PAN_MAX_DEFAULT: f64 = 300.0;

/// Default tilt (pitch, servo) range [deg].
pub const TILT_MIN_DEFAULT: f64 = 0.0;
pub const TILT_MAX_DEFAULT: f64 = 60.0;

/// Stepper resolution: 1.8° per full step.
pub const STEPS_PER_REVOLUTION_DEFAULT: u32 = 200;
/// Upper bound on pulses issued within one tick.
pub const MAX_STEPS_PER_TICK_DEFAULT: u32 = 20;
pub const MAX_STEPS_PER_TICK_MAX: u32 = 1000;
/// Smallest angle delta that produces a step [deg].
pub const STEP_DEADBAND_DEFAULT: f64 = 0.5;

/// Hobby servo pulse range [µs].
pub const SERVO_PULSE_MIN_US: u16 = 544;
pub const SERVO_PULSE_MAX_US: u16 = 2400;

// ─── Motion ─────────────────────────────────────────────────────────

/// Anti-jitter angle tolerance [deg].
pub const ANGLE_TOLERANCE_DEFAULT: f64 = 0.5;
/// Anti-jitter minimum interval between accepted targets [s].
pub const MIN_COMMAND_INTERVAL_DEFAULT: f64 = 0.1;
/// Maximum axis speed [deg/s].
pub const MAX_VELOCITY_DEFAULT: f64 = 90.0;
pub const MAX_VELOCITY_MAX: f64 = 720.0;
/// Acceleration limit [deg/s²].
pub const ACCELERATION_RATE_DEFAULT: f64 = 180.0;
/// Deceleration limit [deg/s²].
pub const DECELERATION_RATE_DEFAULT: f64 = 360.0;
/// Proportional gain from remaining distance to target velocity [1/s].
pub const POSITION_GAIN_DEFAULT: f64 = 4.0;

// ─── Scan ───────────────────────────────────────────────────────────

/// Sweep speed [deg/s].
pub const SCAN_SPEED_DEFAULT: f64 = 20.0;
pub const SCAN_SPEED_MIN: f64 = 0.5;
pub const SCAN_SPEED_MAX: f64 = 180.0;

/// Spiral center [deg].
pub const SPIRAL_CENTER_PAN_DEFAULT: f64 = 150.0;
pub const SPIRAL_CENTER_TILT_DEFAULT: f64 = 30.0;
/// Spiral angular increment per tick [deg].
pub const SPIRAL_ANGLE_STEP_DEFAULT: f64 = 1.5;
/// Spiral radius increment per revolution [deg].
pub const SPIRAL_RADIUS_STEP_DEFAULT: f64 = 2.5;
/// Spiral reset threshold [deg].
pub const SPIRAL_MAX_RADIUS_DEFAULT: f64 = 25.0;

/// Sector bounds [deg].
pub const SECTOR_LO_DEFAULT: f64 = 60.0;
pub const SECTOR_HI_DEFAULT: f64 = 240.0;

// ─── Tracking ───────────────────────────────────────────────────────

/// Camera resolution [px].
pub const IMAGE_WIDTH_DEFAULT: f64 = 640.0;
pub const IMAGE_HEIGHT_DEFAULT: f64 = 480.0;

/// Lock is destroyed after this long without a matching detection [s].
pub const TARGET_LOST_TIMEOUT_DEFAULT: f64 = 3.0;
pub const TARGET_LOST_TIMEOUT_MIN: f64 = 0.05;
pub const TARGET_LOST_TIMEOUT_MAX: f64 = 60.0;

/// Selection score weights.
pub const SIZE_WEIGHT_DEFAULT: f64 = 0.7;
pub const CENTER_WEIGHT_DEFAULT: f64 = 0.3;

/// Lock dwell before autonomous engagement [s].
pub const ENGAGE_DWELL_DEFAULT: f64 = 1.5;

/// Camera/laser aim offset bound, per axis [deg].
pub const AIM_OFFSET_MAX: f64 = 30.0;

/// Target lead horizon [s]. Zero aims at the last sighting.
pub const LEAD_TIME_DEFAULT: f64 = 0.0;
pub const LEAD_TIME_MAX: f64 = 2.0;

/// Sightings kept per lock for velocity estimation.
pub const TRACK_HISTORY_LEN: usize = 10;
/// Sightings needed before a velocity is reported.
pub const TRACK_HISTORY_MIN: usize = 3;

/// Capacity of one published detection frame.
pub const MAX_DETECTIONS: usize = 32;

// ─── Safety / Authority ─────────────────────────────────────────────

/// Communication staleness threshold [s].
pub const COMM_STALE_THRESHOLD_DEFAULT: f64 = 2.0;
pub const COMM_STALE_THRESHOLD_MIN: f64 = 0.1;

/// Manual → Autonomous authority timeout [s].
pub const MANUAL_TIMEOUT_DEFAULT: f64 = 30.0;
pub const MANUAL_TIMEOUT_MIN: f64 = 1.0;
pub const MANUAL_TIMEOUT_MAX: f64 = 3600.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/turret.toml";

const_assert!(MAX_DETECTIONS > 0 && MAX_DETECTIONS <= 256);
const_assert!(MAX_RX_BYTES_PER_TICK >= 64);
const_assert!(TRACK_HISTORY_MIN >= 2 && TRACK_HISTORY_MIN <= TRACK_HISTORY_LEN);
const_assert!(SERVO_PULSE_MIN_US < SERVO_PULSE_MAX_US);
const_assert!(CYCLE_TIME_MS >= CYCLE_TIME_MS_MIN && CYCLE_TIME_MS <= CYCLE_TIME_MS_MAX);
