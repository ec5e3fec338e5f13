// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use eyedrive_config::{load_config_or_default, validate_config, EyedriveConfig, SpeechEngine};
use eyedrive_core::{AnnouncementGate, ControlCore, SignalExtractor, SpeechWorker};
use eyedrive_hal::{
    ArduinoLink, CommandSink, DeviceSerial, LinkTiming, LogCommandSink, LogSpeech, ProcessSpeech,
    RangeSensor, SharedLink, SpeechSink,
};
use eyedrive_observability::{init_logging, parse_debug_flags, LoggingConfig};
use eyedrive_runtime::{ControlLoop, FrameSource, LoopSettings, Session, StopReason};

/// EyeDrive - gaze and blink driven wheelchair controller
#[derive(Parser, Debug)]
#[command(name = "eyedrive", version, author, long_about = None)]
struct Args {
    /// Path to eyedrive.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recorded session to replay (JSON lines)
    #[arg(short, long)]
    session: PathBuf,

    /// Serial port of the motor/ranging board
    #[arg(long)]
    port: Option<String>,

    /// Log commands instead of opening the serial port; distances come from the session
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Control loop frequency in Hz
    #[arg(long)]
    fps: Option<u32>,

    /// Replay as fast as possible instead of pacing to the frame rate
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// Extra config overrides, e.g. `--set toggle_hold_ms=1200`
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn main() -> ExitCode {
    // --debug-<crate> flags are handled by the observability layer, not clap
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|arg| !arg.starts_with("--debug-")));

    let config = match load_configuration(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let logging = LoggingConfig {
        level: if args.verbose {
            "debug".to_string()
        } else {
            config.system.log_level.clone()
        },
        ..LoggingConfig::default()
    };
    let _guard = match init_logging(&debug_flags, &logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    print_banner();

    match run(&args, &config) {
        Ok(StopReason::Interrupted) => {
            info!(target: "eyedrive_runtime", "✅ EyeDrive shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(StopReason::CaptureEnded) => {
            warn!(target: "eyedrive_runtime", "No more frames, EyeDrive stopped");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(target: "eyedrive_runtime", "EyeDrive stopped: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_configuration(args: &Args) -> Result<EyedriveConfig> {
    let mut overrides: HashMap<String, String> = args.overrides.iter().cloned().collect();
    if let Some(port) = &args.port {
        overrides.insert("serial_port".to_string(), port.clone());
    }
    if let Some(fps) = args.fps {
        overrides.insert("fps".to_string(), fps.to_string());
    }
    if args.verbose {
        overrides.insert("debug".to_string(), "true".to_string());
    }

    let config = load_config_or_default(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn run(args: &Args, config: &EyedriveConfig) -> Result<StopReason> {
    let settings = LoopSettings {
        pace: !args.fast,
        ..LoopSettings::from(config)
    };

    let session = Session::load(&args.session)?;
    info!(target: "eyedrive_runtime", "Replaying {} frames from {}", session.len(), args.session.display());
    let (frames, extractor, session_ranging) = session.into_replay(settings.cycle_interval());

    let core = ControlCore::from_config(config)?;
    let gate = AnnouncementGate::new(build_speech(config));
    let speech = SpeechWorker::spawn(gate, config.speech.queue_capacity)?;
    info!(
        target: "eyedrive_runtime",
        "✓ Core ready (EAR < {}, toggle hold {} ms, obstacle < {} / <= {})",
        config.vision.ear_threshold,
        config.motion.toggle_hold_ms,
        config.obstacle.blocked_below,
        config.obstacle.warning_up_to
    );

    if args.dry_run {
        info!(target: "eyedrive_runtime", "Dry run: commands are logged, not sent");
        let control = ControlLoop::new(
            frames,
            extractor,
            LogCommandSink::new(),
            session_ranging,
            core,
            speech,
            settings,
        );
        drive(control)
    } else {
        let link = open_link(config)?;
        let control = ControlLoop::new(
            frames,
            extractor,
            link.clone(),
            link,
            core,
            speech,
            settings,
        );
        drive(control)
    }
}

fn drive<F, X, C, R>(mut control: ControlLoop<F, X, C, R>) -> Result<StopReason>
where
    F: FrameSource,
    X: SignalExtractor,
    C: CommandSink,
    R: RangeSensor,
{
    let running = control.running_flag();
    ctrlc::set_handler(move || {
        info!(target: "eyedrive_runtime", "Shutdown signal received...");
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let reason = control.run()?;
    let stats = control.stats();
    info!(
        target: "eyedrive_runtime",
        "Session totals: {} cycles, {} commands sent, {} send failures",
        stats.cycles,
        stats.commands_sent,
        stats.send_failures
    );
    Ok(reason)
}

fn build_speech(config: &EyedriveConfig) -> Box<dyn SpeechSink + Send> {
    match config.speech.engine {
        SpeechEngine::Log => Box::new(LogSpeech::new()),
        SpeechEngine::Command => {
            info!(target: "eyedrive_runtime", "Speech through '{}'", config.speech.program);
            Box::new(ProcessSpeech::new(
                config.speech.program.clone(),
                config.speech.args.clone(),
            ))
        }
    }
}

fn open_link(config: &EyedriveConfig) -> Result<SharedLink<DeviceSerial>> {
    let timeout = Duration::from_millis(config.serial.timeout_ms);
    let serial = DeviceSerial::open(&config.serial.port, timeout)
        .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;
    info!(
        target: "eyedrive_runtime",
        "Opened {}, waiting {} ms for the board",
        config.serial.port,
        config.serial.open_delay_ms
    );
    thread::sleep(Duration::from_millis(config.serial.open_delay_ms));

    let timing = LinkTiming {
        timeout,
        settle: Duration::from_millis(config.serial.settle_ms),
    };
    Ok(ArduinoLink::new(serial, timing).into_shared())
}

fn print_banner() {
    println!(
        r#"
╔═══════════════════════════════════════════════════╗
║                                                   ║
║   EyeDrive v{:<8}                               ║
║   Gaze and blink driven wheelchair control        ║
║                                                   ║
╚═══════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
