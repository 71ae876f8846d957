//! # Turret Control Unit
//!
//! Fixed-period motion and targeting loop for a pan/tilt platform.
//!
//! Operator commands are read from stdin (text lines or 4-byte binary
//! frames) and replies are written to stdout; logs go to stderr.
//! Detections are optionally replayed from an NDJSON file on a separate
//! thread.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use turret_common::control_unit::config::TurretConfig;
use turret_control_unit::config::load_or_default;
use turret_control_unit::cycle::{CycleRunner, rt_setup};
use turret_control_unit::tracking::{DetectionFeed, load_replay, spawn_replay};
use turret_hal::channel::StreamChannel;
use turret_hal::driver_registry::DriverRegistry;

/// Turret Control Unit: pan/tilt motion and targeting loop
#[derive(Parser, Debug)]
#[command(name = "turret_control_unit")]
#[command(version)]
#[command(about = "Fixed-period motion and targeting loop for a pan/tilt platform")]
struct Args {
    /// Path to the TOML configuration. Built-in defaults when absent.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Actuator driver name.
    #[arg(long, default_value = "simulation")]
    driver: String,

    /// NDJSON detection replay file (one JSON array per line).
    #[arg(long, value_name = "FILE")]
    detections: Option<PathBuf>,

    /// Replay frame rate [frames/s].
    #[arg(long, default_value_t = 10.0)]
    detection_fps: f64,

    /// Stop once stdin reaches end of file.
    #[arg(long)]
    exit_on_eof: bool,

    /// CPU core to pin the loop thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (at least DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Config is read before tracing so `[shared] log_level` can set the filter.
    let config = load_or_default(args.config.as_deref());
    let level = match &config {
        Ok(cfg) => cfg.shared.log_level.as_tracing(),
        Err(_) => Level::INFO,
    };
    setup_tracing(&args, level);

    info!("Turret Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Turret Control Unit shutdown complete");
}

fn run(args: &Args, config: TurretConfig) -> Result<(), Box<dyn std::error::Error>> {
    match &args.config {
        Some(path) => info!("Config loaded from {}", path.display()),
        None => warn!("No --config given, using built-in defaults"),
    }
    info!(
        "Config OK: service={}, cycle_time={}ms, pan=[{}, {}], tilt=[{}, {}], scan={}",
        config.shared.service_name,
        config.cycle.cycle_time_ms,
        config.pan.min_angle,
        config.pan.max_angle,
        config.tilt.min_angle,
        config.tilt.max_angle,
        config.scan.default_mode,
    );

    let registry = DriverRegistry::with_builtin();
    let driver = registry.create_driver(&args.driver).inspect_err(|_| {
        warn!("Available drivers: {}", registry.list_drivers().join(", "));
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let (publisher, reader) = DetectionFeed::pair();
    let replay = match &args.detections {
        Some(path) => {
            let frames = load_replay(path)?;
            info!("Loaded {} detection frames from {}", frames.len(), path.display());
            Some(spawn_replay(frames, publisher, args.detection_fps, Arc::clone(&running))?)
        }
        None => {
            info!("No detection source, scanning only");
            None
        }
    };

    let channel = StreamChannel::spawn(std::io::stdin(), std::io::stdout())?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut runner = CycleRunner::new(config, driver, Box::new(channel), reader)?
        .exit_on_disconnect(args.exit_on_eof);
    let result = runner.run(&running);

    running.store(false, Ordering::SeqCst);
    if let Some(handle) = replay {
        if handle.join().is_err() {
            warn!("Detection replay thread panicked");
        }
    }

    result?;
    Ok(())
}

/// Setup tracing subscriber. Logs go to stderr so stdout carries protocol
/// replies only. `--verbose` raises the configured level to at least DEBUG.
fn setup_tracing(args: &Args, configured: Level) {
    let level = if args.verbose {
        configured.max(Level::DEBUG)
    } else {
        configured
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
