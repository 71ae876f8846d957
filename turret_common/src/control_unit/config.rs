//! Configuration structures for the control unit.
//!
//! All config types use `serde::Deserialize` for TOML loading.
//! Numeric parameters have const `MIN`/`MAX` bounds checked by `validate()`.
//! Every field has a `#[serde(default)]` so a partial file is valid.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::*;
use crate::types::AxisLimits;

use super::state::ScanMode;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level control unit configuration.
///
/// Loaded from TOML at startup and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurretConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub pan: PanAxisConfig,
    #[serde(default)]
    pub tilt: TiltAxisConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl TurretConfig {
    /// Validate every section plus cross-section constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        let sections = [
            self.cycle.validate(),
            self.pan.validate(),
            self.tilt.validate(),
            self.motion.validate(),
            self.scan.validate(),
            self.tracking.validate(),
            self.safety.validate(),
            self.scan.validate_against(&self.pan.limits(), &self.tilt.limits()),
        ];
        for result in sections {
            result.map_err(ConfigError::ValidationError)?;
        }
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Tick loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Tick period [ms] (default: 10).
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u32,
    /// Telemetry snapshot interval [ticks] (default: 50).
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval: u32,
    /// Manual → Autonomous authority timeout [s] (default: 30.0).
    #[serde(default = "default_manual_timeout")]
    pub manual_timeout: f64,
}

fn default_cycle_time_ms() -> u32 {
    CYCLE_TIME_MS
}
fn default_telemetry_interval() -> u32 {
    TELEMETRY_INTERVAL_DEFAULT
}
fn default_manual_timeout() -> f64 {
    MANUAL_TIMEOUT_DEFAULT
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS,
            telemetry_interval: TELEMETRY_INTERVAL_DEFAULT,
            manual_timeout: MANUAL_TIMEOUT_DEFAULT,
        }
    }
}

impl CycleConfig {
    /// Tick period in seconds.
    #[inline]
    pub fn cycle_time_s(&self) -> f64 {
        self.cycle_time_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_ms < CYCLE_TIME_MS_MIN || self.cycle_time_ms > CYCLE_TIME_MS_MAX {
            return Err(format!(
                "cycle_time_ms {} out of range [{}, {}]",
                self.cycle_time_ms, CYCLE_TIME_MS_MIN, CYCLE_TIME_MS_MAX
            ));
        }
        if self.telemetry_interval == 0 {
            return Err("telemetry_interval must be >= 1".to_string());
        }
        if !(MANUAL_TIMEOUT_MIN..=MANUAL_TIMEOUT_MAX).contains(&self.manual_timeout) {
            return Err(format!(
                "manual_timeout {} out of range [{}, {}]",
                self.manual_timeout, MANUAL_TIMEOUT_MIN, MANUAL_TIMEOUT_MAX
            ));
        }
        Ok(())
    }
}

// ─── Axes ───────────────────────────────────────────────────────────

fn check_range(name: &str, min: f64, max: f64) -> Result<(), String> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(format!("{name}: min_angle {min} must be < max_angle {max}"));
    }
    Ok(())
}

/// Pan axis: stepper driven, stepped actuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanAxisConfig {
    #[serde(default = "default_pan_min")]
    pub min_angle: f64,
    #[serde(default = "default_pan_max")]
    pub max_angle: f64,
    /// Full steps per motor revolution (default: 200).
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u32,
    /// Pulse budget per tick (default: 20).
    #[serde(default = "default_max_steps_per_tick")]
    pub max_steps_per_tick: u32,
    /// Smallest delta that produces a step [deg] (default: 0.5).
    #[serde(default = "default_step_deadband")]
    pub step_deadband: f64,
}

fn default_pan_min() -> f64 {
    PAN_MIN_DEFAULT
}
fn default_pan_max() -> f64 {
    PAN_MAX_DEFAULT
}
fn default_steps_per_revolution() -> u32 {
    STEPS_PER_REVOLUTION_DEFAULT
}
fn default_max_steps_per_tick() -> u32 {
    MAX_STEPS_PER_TICK_DEFAULT
}
fn default_step_deadband() -> f64 {
    STEP_DEADBAND_DEFAULT
}

impl Default for PanAxisConfig {
    fn default() -> Self {
        Self {
            min_angle: PAN_MIN_DEFAULT,
            max_angle: PAN_MAX_DEFAULT,
            steps_per_revolution: STEPS_PER_REVOLUTION_DEFAULT,
            max_steps_per_tick: MAX_STEPS_PER_TICK_DEFAULT,
            step_deadband: STEP_DEADBAND_DEFAULT,
        }
    }
}

impl PanAxisConfig {
    #[inline]
    pub fn limits(&self) -> AxisLimits {
        AxisLimits::new(self.min_angle, self.max_angle)
    }

    /// Angle covered by one full step [deg].
    #[inline]
    pub fn step_angle(&self) -> f64 {
        360.0 / self.steps_per_revolution as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        check_range("pan", self.min_angle, self.max_angle)?;
        if self.steps_per_revolution == 0 {
            return Err("pan.steps_per_revolution must be > 0".to_string());
        }
        if self.max_steps_per_tick == 0 || self.max_steps_per_tick > MAX_STEPS_PER_TICK_MAX {
            return Err(format!(
                "pan.max_steps_per_tick {} out of range [1, {}]",
                self.max_steps_per_tick, MAX_STEPS_PER_TICK_MAX
            ));
        }
        if !(self.step_deadband >= 0.0) {
            return Err(format!(
                "pan.step_deadband {} must be >= 0",
                self.step_deadband
            ));
        }
        Ok(())
    }
}

/// Tilt axis: servo driven, continuous actuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiltAxisConfig {
    #[serde(default = "default_tilt_min")]
    pub min_angle: f64,
    #[serde(default = "default_tilt_max")]
    pub max_angle: f64,
    /// Pulse width at `min_angle` [µs].
    #[serde(default = "default_pulse_min")]
    pub pulse_min_us: u16,
    /// Pulse width at `max_angle` [µs].
    #[serde(default = "default_pulse_max")]
    pub pulse_max_us: u16,
}

fn default_tilt_min() -> f64 {
    TILT_MIN_DEFAULT
}
fn default_tilt_max() -> f64 {
    TILT_MAX_DEFAULT
}
fn default_pulse_min() -> u16 {
    SERVO_PULSE_MIN_US
}
fn default_pulse_max() -> u16 {
    SERVO_PULSE_MAX_US
}

impl Default for TiltAxisConfig {
    fn default() -> Self {
        Self {
            min_angle: TILT_MIN_DEFAULT,
            max_angle: TILT_MAX_DEFAULT,
            pulse_min_us: SERVO_PULSE_MIN_US,
            pulse_max_us: SERVO_PULSE_MAX_US,
        }
    }
}

impl TiltAxisConfig {
    #[inline]
    pub fn limits(&self) -> AxisLimits {
        AxisLimits::new(self.min_angle, self.max_angle)
    }

    pub fn validate(&self) -> Result<(), String> {
        check_range("tilt", self.min_angle, self.max_angle)?;
        if self.pulse_min_us >= self.pulse_max_us {
            return Err(format!(
                "tilt: pulse_min_us {} must be < pulse_max_us {}",
                self.pulse_min_us, self.pulse_max_us
            ));
        }
        Ok(())
    }
}

// ─── Motion ─────────────────────────────────────────────────────────

/// Smoothing and anti-jitter parameters, shared by both axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Targets closer than this to the last applied one are filtered [deg].
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f64,
    /// Targets arriving faster than this are filtered [s].
    #[serde(default = "default_min_command_interval")]
    pub min_command_interval: f64,
    /// [deg/s]
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f64,
    /// [deg/s²]
    #[serde(default = "default_acceleration_rate")]
    pub acceleration_rate: f64,
    /// [deg/s²]
    #[serde(default = "default_deceleration_rate")]
    pub deceleration_rate: f64,
    /// Remaining distance → target velocity gain [1/s].
    #[serde(default = "default_position_gain")]
    pub position_gain: f64,
}

fn default_angle_tolerance() -> f64 {
    ANGLE_TOLERANCE_DEFAULT
}
fn default_min_command_interval() -> f64 {
    MIN_COMMAND_INTERVAL_DEFAULT
}
fn default_max_velocity() -> f64 {
    MAX_VELOCITY_DEFAULT
}
fn default_acceleration_rate() -> f64 {
    ACCELERATION_RATE_DEFAULT
}
fn default_deceleration_rate() -> f64 {
    DECELERATION_RATE_DEFAULT
}
fn default_position_gain() -> f64 {
    POSITION_GAIN_DEFAULT
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            angle_tolerance: ANGLE_TOLERANCE_DEFAULT,
            min_command_interval: MIN_COMMAND_INTERVAL_DEFAULT,
            max_velocity: MAX_VELOCITY_DEFAULT,
            acceleration_rate: ACCELERATION_RATE_DEFAULT,
            deceleration_rate: DECELERATION_RATE_DEFAULT,
            position_gain: POSITION_GAIN_DEFAULT,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.angle_tolerance >= 0.0) {
            return Err(format!(
                "motion.angle_tolerance {} must be >= 0",
                self.angle_tolerance
            ));
        }
        if !(self.min_command_interval >= 0.0) {
            return Err(format!(
                "motion.min_command_interval {} must be >= 0",
                self.min_command_interval
            ));
        }
        if !(self.max_velocity > 0.0 && self.max_velocity <= MAX_VELOCITY_MAX) {
            return Err(format!(
                "motion.max_velocity {} out of range (0, {}]",
                self.max_velocity, MAX_VELOCITY_MAX
            ));
        }
        for (name, value) in [
            ("acceleration_rate", self.acceleration_rate),
            ("deceleration_rate", self.deceleration_rate),
            ("position_gain", self.position_gain),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(format!("motion.{name} {value} must be > 0"));
            }
        }
        Ok(())
    }
}

// ─── Scan ───────────────────────────────────────────────────────────

/// Search pattern parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Pattern active at startup (default: sweep).
    #[serde(default)]
    pub default_mode: ScanMode,
    /// Sweep/sector pan speed [deg/s].
    #[serde(default = "default_scan_speed")]
    pub scan_speed: f64,
    /// Tilt held during sweeps [deg] (default: tilt midpoint).
    #[serde(default)]
    pub sweep_tilt: Option<f64>,
    #[serde(default = "default_spiral_center_pan")]
    pub spiral_center_pan: f64,
    #[serde(default = "default_spiral_center_tilt")]
    pub spiral_center_tilt: f64,
    /// Angular increment per tick [deg].
    #[serde(default = "default_spiral_angle_step")]
    pub spiral_angle_step: f64,
    /// Radius increment per revolution [deg].
    #[serde(default = "default_spiral_radius_step")]
    pub spiral_radius_step: f64,
    /// Reset threshold [deg].
    #[serde(default = "default_spiral_max_radius")]
    pub spiral_max_radius: f64,
    #[serde(default = "default_sector_lo")]
    pub sector_lo: f64,
    #[serde(default = "default_sector_hi")]
    pub sector_hi: f64,
}

fn default_scan_speed() -> f64 {
    SCAN_SPEED_DEFAULT
}
fn default_spiral_center_pan() -> f64 {
    SPIRAL_CENTER_PAN_DEFAULT
}
fn default_spiral_center_tilt() -> f64 {
    SPIRAL_CENTER_TILT_DEFAULT
}
fn default_spiral_angle_step() -> f64 {
    SPIRAL_ANGLE_STEP_DEFAULT
}
fn default_spiral_radius_step() -> f64 {
    SPIRAL_RADIUS_STEP_DEFAULT
}
fn default_spiral_max_radius() -> f64 {
    SPIRAL_MAX_RADIUS_DEFAULT
}
fn default_sector_lo() -> f64 {
    SECTOR_LO_DEFAULT
}
fn default_sector_hi() -> f64 {
    SECTOR_HI_DEFAULT
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_mode: ScanMode::Sweep,
            scan_speed: SCAN_SPEED_DEFAULT,
            sweep_tilt: None,
            spiral_center_pan: SPIRAL_CENTER_PAN_DEFAULT,
            spiral_center_tilt: SPIRAL_CENTER_TILT_DEFAULT,
            spiral_angle_step: SPIRAL_ANGLE_STEP_DEFAULT,
            spiral_radius_step: SPIRAL_RADIUS_STEP_DEFAULT,
            spiral_max_radius: SPIRAL_MAX_RADIUS_DEFAULT,
            sector_lo: SECTOR_LO_DEFAULT,
            sector_hi: SECTOR_HI_DEFAULT,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_mode.is_pattern() {
            return Err("scan.default_mode must be sweep, spiral or sector".to_string());
        }
        if !(SCAN_SPEED_MIN..=SCAN_SPEED_MAX).contains(&self.scan_speed) {
            return Err(format!(
                "scan.scan_speed {} out of range [{}, {}]",
                self.scan_speed, SCAN_SPEED_MIN, SCAN_SPEED_MAX
            ));
        }
        if !(self.spiral_angle_step > 0.0 && self.spiral_angle_step < 360.0) {
            return Err(format!(
                "scan.spiral_angle_step {} out of range (0, 360)",
                self.spiral_angle_step
            ));
        }
        if !(self.spiral_radius_step > 0.0) {
            return Err("scan.spiral_radius_step must be > 0".to_string());
        }
        if !(self.spiral_max_radius >= self.spiral_radius_step) {
            return Err(format!(
                "scan.spiral_max_radius {} must be >= spiral_radius_step {}",
                self.spiral_max_radius, self.spiral_radius_step
            ));
        }
        if !(self.sector_lo < self.sector_hi) {
            return Err(format!(
                "scan: sector_lo {} must be < sector_hi {}",
                self.sector_lo, self.sector_hi
            ));
        }
        Ok(())
    }

    /// Check that every pattern stays within the axis ranges.
    pub fn validate_against(&self, pan: &AxisLimits, tilt: &AxisLimits) -> Result<(), String> {
        if let Some(t) = self.sweep_tilt {
            if !tilt.contains(t) {
                return Err(format!("scan.sweep_tilt {t} outside tilt range"));
            }
        }
        let r = self.spiral_max_radius;
        if !pan.contains(self.spiral_center_pan - r) || !pan.contains(self.spiral_center_pan + r)
        {
            return Err(format!(
                "scan: spiral pan {} ± {} exceeds pan range [{}, {}]",
                self.spiral_center_pan, r, pan.min_angle, pan.max_angle
            ));
        }
        if !tilt.contains(self.spiral_center_tilt - r)
            || !tilt.contains(self.spiral_center_tilt + r)
        {
            return Err(format!(
                "scan: spiral tilt {} ± {} exceeds tilt range [{}, {}]",
                self.spiral_center_tilt, r, tilt.min_angle, tilt.max_angle
            ));
        }
        if !pan.contains(self.sector_lo) || !pan.contains(self.sector_hi) {
            return Err(format!(
                "scan: sector [{}, {}] outside pan range",
                self.sector_lo, self.sector_hi
            ));
        }
        Ok(())
    }

    /// Tilt held during sweeps.
    #[inline]
    pub fn sweep_tilt_or(&self, tilt: &AxisLimits) -> f64 {
        self.sweep_tilt.unwrap_or_else(|| tilt.midpoint())
    }
}

// ─── Tracking ───────────────────────────────────────────────────────

/// Target selection and engagement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// [px]
    #[serde(default = "default_image_width")]
    pub image_width: f64,
    /// [px]
    #[serde(default = "default_image_height")]
    pub image_height: f64,
    /// [s]
    #[serde(default = "default_target_lost_timeout")]
    pub target_lost_timeout: f64,
    #[serde(default = "default_size_weight")]
    pub size_weight: f64,
    #[serde(default = "default_center_weight")]
    pub center_weight: f64,
    /// Image rows grow downward; invert so the top of the frame maps to max tilt.
    #[serde(default = "default_true")]
    pub invert_tilt: bool,
    /// Raise a fire request once the lock has dwelled and the axes settled.
    #[serde(default = "default_true")]
    pub auto_engage: bool,
    /// [s]
    #[serde(default = "default_engage_dwell")]
    pub engage_dwell: f64,
    /// Added to the mapped pan angle to put the laser on the target [deg].
    #[serde(default)]
    pub aim_offset_pan: f64,
    /// Added to the mapped tilt angle [deg]. Negative aims lower than the camera sees.
    #[serde(default)]
    pub aim_offset_tilt: f64,
    /// Lead the target by its estimated velocity times this horizon [s]. 0 disables.
    #[serde(default = "default_lead_time")]
    pub lead_time: f64,
}

fn default_image_width() -> f64 {
    IMAGE_WIDTH_DEFAULT
}
fn default_image_height() -> f64 {
    IMAGE_HEIGHT_DEFAULT
}
fn default_target_lost_timeout() -> f64 {
    TARGET_LOST_TIMEOUT_DEFAULT
}
fn default_size_weight() -> f64 {
    SIZE_WEIGHT_DEFAULT
}
fn default_center_weight() -> f64 {
    CENTER_WEIGHT_DEFAULT
}
fn default_true() -> bool {
    true
}
fn default_engage_dwell() -> f64 {
    ENGAGE_DWELL_DEFAULT
}
fn default_lead_time() -> f64 {
    LEAD_TIME_DEFAULT
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            image_width: IMAGE_WIDTH_DEFAULT,
            image_height: IMAGE_HEIGHT_DEFAULT,
            target_lost_timeout: TARGET_LOST_TIMEOUT_DEFAULT,
            size_weight: SIZE_WEIGHT_DEFAULT,
            center_weight: CENTER_WEIGHT_DEFAULT,
            invert_tilt: true,
            auto_engage: true,
            engage_dwell: ENGAGE_DWELL_DEFAULT,
            aim_offset_pan: 0.0,
            aim_offset_tilt: 0.0,
            lead_time: LEAD_TIME_DEFAULT,
        }
    }
}

impl TrackingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.image_width > 0.0 && self.image_height > 0.0) {
            return Err(format!(
                "tracking: image size {}x{} must be positive",
                self.image_width, self.image_height
            ));
        }
        if !(TARGET_LOST_TIMEOUT_MIN..=TARGET_LOST_TIMEOUT_MAX).contains(&self.target_lost_timeout)
        {
            return Err(format!(
                "tracking.target_lost_timeout {} out of range [{}, {}]",
                self.target_lost_timeout, TARGET_LOST_TIMEOUT_MIN, TARGET_LOST_TIMEOUT_MAX
            ));
        }
        if !(self.size_weight >= 0.0 && self.center_weight >= 0.0)
            || self.size_weight + self.center_weight <= 0.0
        {
            return Err("tracking: score weights must be >= 0 with a positive sum".to_string());
        }
        if !(self.engage_dwell >= 0.0) {
            return Err("tracking.engage_dwell must be >= 0".to_string());
        }
        for (name, offset) in [
            ("aim_offset_pan", self.aim_offset_pan),
            ("aim_offset_tilt", self.aim_offset_tilt),
        ] {
            if !(offset.abs() <= AIM_OFFSET_MAX) {
                return Err(format!(
                    "tracking.{name} {offset} must be within ±{AIM_OFFSET_MAX}"
                ));
            }
        }
        if !(0.0..=LEAD_TIME_MAX).contains(&self.lead_time) {
            return Err(format!(
                "tracking.lead_time {} out of range [0, {LEAD_TIME_MAX}]",
                self.lead_time
            ));
        }
        Ok(())
    }
}

// ─── Safety ─────────────────────────────────────────────────────────

/// Interlock parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Pan range `[lo, hi]` where fire output is always OFF.
    #[serde(default)]
    pub no_fire_zone: Option<[f64; 2]>,
    /// Command silence treated as ESTOP [s]. Zero disables the check.
    #[serde(default = "default_comm_stale")]
    pub comm_stale_threshold: f64,
}

fn default_comm_stale() -> f64 {
    COMM_STALE_THRESHOLD_DEFAULT
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            no_fire_zone: None,
            comm_stale_threshold: COMM_STALE_THRESHOLD_DEFAULT,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some([lo, hi]) = self.no_fire_zone {
            if !(lo <= hi) {
                return Err(format!("safety.no_fire_zone [{lo}, {hi}] must have lo <= hi"));
            }
        }
        let t = self.comm_stale_threshold;
        if t != 0.0 && !(t >= COMM_STALE_THRESHOLD_MIN) {
            return Err(format!(
                "safety.comm_stale_threshold {t} must be 0 (disabled) or >= {COMM_STALE_THRESHOLD_MIN}"
            ));
        }
        Ok(())
    }

    /// Staleness threshold, `None` when disabled.
    #[inline]
    pub fn stale_threshold(&self) -> Option<f64> {
        (self.comm_stale_threshold > 0.0).then_some(self.comm_stale_threshold)
    }
}
