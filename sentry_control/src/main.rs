//! # Sentry Control
//!
//! Pan/tilt turret tracking controller.
//!
//! Normal mode homes both axes, then runs the position control loop,
//! the fire sequencer and the piston retraction worker until a
//! shutdown signal arrives. `--calibrate` instead homes and enters
//! the interactive jog mode, persisting the discovered travel limits
//! back to the config file.

use std::path::PathBuf;
use std::process;
use std::sync::mpsc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use sentry_common::TurretConfig;
use sentry_control::calibrate::spawn_stdin_reader;
use sentry_control::rt::rt_setup;
use sentry_control::runner::Runner;
use sentry_hal::backend::{register_builtin, BackendOptions, BackendRegistry};

/// Sentry Control — turret tracking controller
#[derive(Parser, Debug)]
#[command(name = "sentry_control")]
#[command(version)]
#[command(about = "Pan/tilt turret controller with homing, fire sequencing and piston re-arm")]
struct Args {
    /// Path to the turret configuration TOML.
    #[arg(default_value = "config/turret.toml")]
    config: PathBuf,

    /// Hardware backend to drive (see registered backends).
    #[arg(long, default_value = "sim")]
    backend: String,

    /// Seed for the simulated sensor source (sim backend only).
    #[arg(long)]
    seed: Option<u64>,

    /// Run manual travel-limit calibration instead of the controller.
    #[arg(long)]
    calibrate: bool,

    /// CPU core to pin the control threads to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Sentry Control v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Sentry Control shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = BackendRegistry::new();
    register_builtin(&mut registry);

    let options = BackendOptions {
        seed: args.seed,
        trigger_odds: None,
    };
    let backend = registry.create(&args.backend, &options)?;
    info!(backend = %args.backend, "backend ready");

    if args.calibrate {
        return run_calibration(args, backend);
    }

    let config = TurretConfig::load(&args.config)?;
    info!(
        "Config OK: max_steps=({}, {}), tolerance={}, step_delay={}µs",
        config.max_steps_x, config.max_steps_y, config.center_tolerance, config.step_delay_us,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let runner = Runner::new(config);

    // Signal handler for graceful shutdown: every worker exits after
    // its current tick.
    let shared = runner.shared();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shared.request_shutdown();
    })?;

    runner.run(backend)?;
    Ok(())
}

/// The `--calibrate` path: home, jog, persist the discovered limits.
fn run_calibration(
    args: &Args,
    backend: sentry_hal::backend::TurretBackend,
) -> Result<(), Box<dyn std::error::Error>> {
    // The config usually does not exist yet on first calibration; the
    // non-limit fields then come from defaults.
    let mut config = match TurretConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            warn!("No usable config ({e}), calibrating with defaults");
            TurretConfig::with_limits(1, 1)
        }
    };

    let runner = Runner::new(config.clone());
    let shared = runner.shared();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shared.request_shutdown();
    })?;

    // The reader thread is deliberately not joined: on a Ctrl-C abort
    // it is still blocked on stdin and only dies with the process.
    let (tx, rx) = mpsc::channel();
    let _reader = spawn_stdin_reader(tx);

    let Some((max_x, max_y)) = runner.run_calibration(backend, &rx)? else {
        warn!("Calibration aborted before completing, config unchanged");
        return Ok(());
    };

    config.max_steps_x = max_x;
    config.max_steps_y = max_y;
    config.validate()?;
    config.save(&args.config)?;
    info!(
        "Calibration saved to {}: max_steps=({max_x}, {max_y})",
        args.config.display()
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
