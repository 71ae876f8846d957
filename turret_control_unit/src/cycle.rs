//! Fixed-period control cycle: read → safety → track → desired → motion → write.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! All four are no-ops without the `rt` feature.
//!
//! ## Cycle Loop
//! With `rt`, absolute-time `clock_nanosleep` on `CLOCK_MONOTONIC`;
//! otherwise `Instant` + sleep for the remaining budget. Overruns are
//! counted and logged, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use turret_common::consts::MAX_RX_BYTES_PER_TICK;
use turret_common::control_unit::config::TurretConfig;
use turret_common::control_unit::state::{ControlAuthority, ScanMode};
use turret_common::hal::channel::{ByteChannel, ChannelError};
use turret_common::hal::driver::{ActuatorDriver, HalError};
use turret_common::hal::types::ActuationFrame;
use turret_common::types::AxisId;

use crate::motion::{MotionController, MotionError};
use crate::protocol::{
    Command, DecodeError, ErrorCode, FrameDecoder, ModeRequest, Reply, ReplyStyle, StatusReport,
};
use crate::safety::{EstopCause, InterlockError, SafetyInterlock};
use crate::scan::{ScanGenerator, TransitionResult};
use crate::tracking::{DetectionReader, Tracker};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that exceeded the budget.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Event counters carried into telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeCounters {
    pub ticks: u64,
    /// Commands decoded without error.
    pub commands: u64,
    /// `ERR:` replies sent.
    pub error_replies: u64,
    pub driver_errors: u64,
    pub channel_errors: u64,
}

/// Periodic state snapshot, logged as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Telemetry {
    pub tick: u64,
    pub pan_angle: f64,
    pub tilt_angle: f64,
    pub pan_target: f64,
    pub tilt_target: f64,
    pub scan_mode: ScanMode,
    pub scan_pattern: ScanMode,
    pub scan_progress: f64,
    pub completed_patterns: u64,
    pub authority: ControlAuthority,
    pub locked_target: Option<u32>,
    pub fire_requested: bool,
    pub fire_output: bool,
    pub estop: bool,
    pub interlock_flags: u8,
    pub total_steps: u64,
    pub avg_cycle_us: f64,
    pub overruns: u64,
    pub counters: RuntimeCounters,
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Actuator driver failed to start or stop.
    #[error("driver error: {0}")]
    Driver(#[from] HalError),
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop does not fault it in later.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference.
        unsafe { core::ptr::write_volatile(byte, 0xA5) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup. Call before entering the cycle loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns every subsystem and runs one tick at a time.
pub struct CycleRunner {
    config: TurretConfig,
    driver: Box<dyn ActuatorDriver>,
    channel: Box<dyn ByteChannel>,
    detections: DetectionReader,
    decoder: FrameDecoder,
    interlock: SafetyInterlock,
    motion: MotionController,
    scan: ScanGenerator,
    tracker: Tracker,
    authority: ControlAuthority,
    last_manual_time: f64,
    manual_fire: bool,
    fire_requested: bool,
    last_frame: ActuationFrame,
    last_tick: Option<f64>,
    channel_open: bool,
    exit_on_disconnect: bool,
    /// Cycle statistics (wall-clock loop only).
    pub stats: CycleStats,
    counters: RuntimeCounters,
}

impl CycleRunner {
    /// Initialize the driver and build all subsystems at the home pose.
    pub fn new(
        config: TurretConfig,
        mut driver: Box<dyn ActuatorDriver>,
        channel: Box<dyn ByteChannel>,
        detections: DetectionReader,
    ) -> Result<Self, CycleError> {
        driver.init(&config)?;
        info!(driver = driver.name(), "Actuator driver initialized");

        let home = MotionController::home(&config);
        Ok(Self {
            interlock: SafetyInterlock::new(&config, 0.0),
            motion: MotionController::new(&config, home),
            scan: ScanGenerator::new(&config),
            tracker: Tracker::new(&config),
            decoder: FrameDecoder::new(),
            config,
            driver,
            channel,
            detections,
            authority: ControlAuthority::Autonomous,
            last_manual_time: 0.0,
            manual_fire: false,
            fire_requested: false,
            last_frame: ActuationFrame::HALTED,
            last_tick: None,
            channel_open: true,
            exit_on_disconnect: false,
            stats: CycleStats::new(),
            counters: RuntimeCounters::default(),
        })
    }

    /// Leave `run()` once the command channel reports end of stream.
    pub fn exit_on_disconnect(mut self, enabled: bool) -> Self {
        self.exit_on_disconnect = enabled;
        self
    }

    #[inline]
    pub const fn config(&self) -> &TurretConfig {
        &self.config
    }

    #[inline]
    pub const fn interlock(&self) -> &SafetyInterlock {
        &self.interlock
    }

    #[inline]
    pub const fn motion(&self) -> &MotionController {
        &self.motion
    }

    #[inline]
    pub const fn scan(&self) -> &ScanGenerator {
        &self.scan
    }

    #[inline]
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    #[inline]
    pub const fn authority(&self) -> ControlAuthority {
        self.authority
    }

    #[inline]
    pub const fn counters(&self) -> &RuntimeCounters {
        &self.counters
    }

    /// Output written by the most recent tick.
    #[inline]
    pub const fn last_frame(&self) -> &ActuationFrame {
        &self.last_frame
    }

    #[inline]
    pub const fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    #[inline]
    pub const fn channel_open(&self) -> bool {
        self.channel_open
    }

    /// Run one tick at `now` seconds since start.
    ///
    /// The first tick integrates over one nominal cycle.
    pub fn tick(&mut self, now: f64) {
        let dt = match self.last_tick {
            Some(prev) => (now - prev).max(0.0),
            None => self.config.cycle.cycle_time_s(),
        };
        self.last_tick = Some(now);
        self.counters.ticks += 1;

        // ═══ READ ═══
        self.read_commands(now);

        // ═══ SAFETY ═══
        if self.interlock.check_staleness(now) {
            self.halt_outputs();
        }
        if self.authority == ControlAuthority::Manual
            && now - self.last_manual_time > self.config.cycle.manual_timeout
        {
            info!(
                idle_s = now - self.last_manual_time,
                "Manual timeout, returning to autonomous control"
            );
            self.authority = ControlAuthority::Autonomous;
        }

        // ═══ TRACK ═══
        let frame = self.detections.latest();
        let update = self.tracker.update(&frame, now);
        if update.lost.is_some() {
            self.scan.target_lost();
        }
        if update.acquired.is_some() {
            self.scan.target_acquired();
        }

        // ═══ DESIRED ═══
        if self.authority == ControlAuthority::Autonomous && !self.interlock.is_estopped() {
            let desired = match self.tracker.desired_pose() {
                Some(pose) => Some(pose),
                None => self.scan.next_pose(dt),
            };
            if let Some(pose) = desired {
                let pose = self.interlock.clamp_pose(pose);
                if let Err(e) = self.motion.set_pose_target(pose, now) {
                    debug!("Desired pose dropped: {e}");
                }
            }
        }

        // ═══ MOTION ═══
        self.motion.update(dt);
        trace!(
            pan = self.motion.pose().pan_angle,
            tilt = self.motion.pose().tilt_angle,
            "Motion updated"
        );

        // ═══ WRITE ═══
        let engage = self.authority == ControlAuthority::Autonomous
            && self.tracker.engage_request(now, self.motion.is_settled());
        self.fire_requested = self.manual_fire || engage;
        let fire = self
            .interlock
            .gate_fire(self.fire_requested, self.motion.pose().pan_angle);
        let frame = self.motion.actuation(fire);
        if let Err(e) = self.driver.apply(&frame) {
            self.counters.driver_errors += 1;
            warn!("Driver apply failed: {e}");
        }
        self.last_frame = frame;

        let interval = u64::from(self.config.cycle.telemetry_interval.max(1));
        if self.counters.ticks % interval == 0 {
            self.emit_telemetry();
        }
    }

    /// Snapshot for telemetry and tests.
    pub fn telemetry(&self) -> Telemetry {
        let pose = self.motion.pose();
        let target = self.motion.target();
        Telemetry {
            tick: self.counters.ticks,
            pan_angle: pose.pan_angle,
            tilt_angle: pose.tilt_angle,
            pan_target: target.pan_angle,
            tilt_target: target.tilt_angle,
            scan_mode: self.scan.mode(),
            scan_pattern: self.scan.pattern(),
            scan_progress: self.scan.progress(),
            completed_patterns: self.scan.completed_patterns(),
            authority: self.authority,
            locked_target: self.tracker.lock().map(|l| l.detection_id),
            fire_requested: self.fire_requested,
            fire_output: self.last_frame.fire,
            estop: self.interlock.is_estopped(),
            interlock_flags: self.interlock.flags().bits(),
            total_steps: self.motion.total_steps(),
            avg_cycle_us: self.stats.avg_cycle_ns() as f64 / 1000.0,
            overruns: self.stats.overruns,
            counters: self.counters,
        }
    }

    /// Wall-clock loop until `running` clears.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        info!(
            cycle_ms = self.config.cycle.cycle_time_ms,
            mode = %self.scan.mode(),
            "Entering control loop"
        );

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running)?;
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running);
        }

        self.shutdown()
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) {
        use std::time::{Duration, Instant};

        let budget = Duration::from_secs_f64(self.config.cycle.cycle_time_s());
        let start = Instant::now();

        while self.keep_running(running) {
            let cycle_start = Instant::now();
            self.tick(cycle_start.duration_since(start).as_secs_f64());

            let elapsed = cycle_start.elapsed();
            self.stats.record(elapsed.as_nanos() as i64, 0);
            match budget.checked_sub(elapsed) {
                Some(remaining) => std::thread::sleep(remaining),
                None => self.note_overrun(elapsed.as_nanos() as i64),
            }
        }
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))
        };
        let budget_ns = i64::from(self.config.cycle.cycle_time_ms) * 1_000_000;
        let start = now()?;
        let mut next_wake = start;

        while self.keep_running(running) {
            next_wake = timespec_add_ns(next_wake, budget_ns);
            let cycle_start = now()?;
            self.tick(timespec_diff_ns(&cycle_start, &start) as f64 * 1e-9);

            let cycle_end = now()?;
            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            self.stats.record(duration_ns, latency_ns);
            if duration_ns > budget_ns {
                self.note_overrun(duration_ns);
                next_wake = cycle_end;
            }
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Force the laser off and stop the driver.
    pub fn shutdown(&mut self) -> Result<(), CycleError> {
        let safe = ActuationFrame {
            pan_steps: None,
            fire: false,
            ..self.last_frame
        };
        if let Err(e) = self.driver.apply(&safe) {
            warn!("Final safe frame failed: {e}");
        }
        self.last_frame = safe;
        self.driver.shutdown()?;
        info!(
            ticks = self.counters.ticks,
            overruns = self.stats.overruns,
            avg_cycle_ns = self.stats.avg_cycle_ns(),
            "Control loop stopped"
        );
        Ok(())
    }

    fn keep_running(&self, running: &AtomicBool) -> bool {
        running.load(Ordering::SeqCst) && (self.channel_open || !self.exit_on_disconnect)
    }

    fn note_overrun(&mut self, duration_ns: i64) {
        self.stats.overruns += 1;
        // First overrun, then every 100th.
        if self.stats.overruns % 100 == 1 {
            warn!(
                duration_ns,
                total = self.stats.overruns,
                "Cycle overrun"
            );
        }
    }

    fn emit_telemetry(&self) {
        match serde_json::to_string(&self.telemetry()) {
            Ok(json) => debug!(target: "turret::telemetry", "{json}"),
            Err(e) => warn!("Telemetry serialization failed: {e}"),
        }
    }

    // ─── READ phase ─────────────────────────────────────────────────

    fn read_commands(&mut self, now: f64) {
        if !self.channel_open {
            return;
        }
        let mut buf = [0u8; MAX_RX_BYTES_PER_TICK];
        let n = match self.channel.read_available(&mut buf) {
            Ok(n) => n,
            Err(ChannelError::Disconnected) => {
                info!("Command channel closed");
                self.channel_open = false;
                return;
            }
            Err(e) => {
                self.counters.channel_errors += 1;
                warn!("Command channel read failed: {e}");
                return;
            }
        };
        for &byte in &buf[..n] {
            if let Some(result) = self.decoder.push(byte) {
                self.handle_decoded(result, now);
            }
        }
    }

    fn handle_decoded(&mut self, result: Result<Command, DecodeError>, now: f64) {
        match result {
            Ok(cmd) => {
                self.counters.commands += 1;
                self.interlock.note_command(now);
                if let Some(reply) = self.dispatch(cmd, now) {
                    self.send(reply);
                }
            }
            Err(e) => {
                if let Some(reply) = e.reply() {
                    self.send(reply);
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: Command, now: f64) -> Option<Reply> {
        if self.interlock.is_estopped() && !cmd.allowed_during_estop() {
            debug!("Rejected {cmd:?}: emergency stop active");
            return Some(Reply::Error(ErrorCode::EstopActive));
        }

        match cmd {
            Command::SetAngle { axis, angle, style } => {
                let angle = match self.interlock.validate_target(axis, angle) {
                    Ok(angle) => angle,
                    Err(InterlockError::OutOfRange { .. }) => {
                        return Some(Reply::Error(ErrorCode::range(axis)));
                    }
                    Err(InterlockError::EstopActive) => {
                        return Some(Reply::Error(ErrorCode::EstopActive));
                    }
                };
                match self.motion.set_target(axis, angle, now) {
                    Ok(true) => {}
                    Ok(false) => debug!(?axis, angle, "Target within jitter filter, kept"),
                    Err(MotionError::Halted) => {
                        return Some(Reply::Error(ErrorCode::EstopActive));
                    }
                }
                self.take_manual(now);
                // Acknowledge what was committed, not what was asked for.
                let committed = self.motion.axis(axis).state().target_angle;
                match style {
                    ReplyStyle::Silent => None,
                    ReplyStyle::Acknowledge => Some(match axis {
                        AxisId::Pan => Reply::YawOk(committed),
                        AxisId::Tilt => Reply::PitchOk(committed),
                    }),
                }
            }
            Command::Fire { on, style } => {
                if self.manual_fire != on {
                    info!(on, "Operator fire request");
                }
                self.manual_fire = on;
                match style {
                    ReplyStyle::Silent => None,
                    ReplyStyle::Acknowledge => Some(Reply::FireOk(on)),
                }
            }
            Command::EmergencyStop => {
                self.interlock.trigger_estop(EstopCause::Operator);
                self.halt_outputs();
                Some(Reply::Estop)
            }
            Command::Status => Some(Reply::Status(self.status_report())),
            Command::Reset => {
                self.interlock.reset(now);
                self.motion.release();
                if let Some(id) = self.tracker.clear() {
                    info!(id, "Target lock dropped on reset");
                    self.scan.target_lost();
                }
                Some(Reply::ResetOk)
            }
            Command::SelectMode(request) => {
                if let ModeRequest::Pattern(pattern) = request {
                    if let TransitionResult::Rejected(reason) = self.scan.select_pattern(pattern) {
                        warn!("Mode change rejected: {reason}");
                        return Some(Reply::Error(ErrorCode::BadArg));
                    }
                }
                if self.authority != ControlAuthority::Autonomous {
                    info!("Autonomous control resumed ({request})");
                }
                self.authority = ControlAuthority::Autonomous;
                Some(Reply::ModeOk(request))
            }
        }
    }

    fn take_manual(&mut self, now: f64) {
        self.last_manual_time = now;
        if self.authority != ControlAuthority::Manual {
            info!("Manual control engaged");
            self.authority = ControlAuthority::Manual;
        }
    }

    /// ESTOP consequence: motion halted and the operator fire latch dropped.
    fn halt_outputs(&mut self) {
        self.motion.halt();
        self.manual_fire = false;
    }

    fn status_report(&self) -> StatusReport {
        let pose = self.motion.pose();
        StatusReport {
            pan_angle: pose.pan_angle,
            tilt_angle: pose.tilt_angle,
            fire: self.last_frame.fire,
            estop: self.interlock.is_estopped(),
        }
    }

    fn send(&mut self, reply: Reply) {
        if matches!(reply, Reply::Error(_)) {
            self.counters.error_replies += 1;
        }
        let line = reply.to_string();
        debug!("Reply {line}");
        if let Err(e) = self.channel.write_line(&line) {
            self.counters.channel_errors += 1;
            warn!("Reply write failed: {e}");
        }
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() as i64 + ns;
    let secs = ts.tv_sec() as i64 + total.div_euclid(1_000_000_000);
    let nanos = total.rem_euclid(1_000_000_000);
    TimeSpec::new(secs as _, nanos as _)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() as i64 - b.tv_sec() as i64) * 1_000_000_000
        + (a.tv_nsec() as i64 - b.tv_nsec() as i64)
}

// ─── Tests ──────────────────────────────────────────────────────────
