//! Curl tracker (repcount-tr) - Main entry point
//!
//! Replays a recorded pose stream through a workout session and prints the
//! resulting workout log entry as JSON. Ctrl+C ends the workout early, the
//! same way the "end workout" action does in the app.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use repcount_common::config::{resolve_config_path, TomlConfig};
use repcount_common::events::{EventBus, RepEvent};
use repcount_tr::overlay::OverlayTracker;
use repcount_tr::source::{RecordedPose, ReplaySource};
use repcount_tr::{BuildInfo, SessionRegistry, StopReason, WorkoutRunner};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Command-line arguments for repcount-tr
#[derive(Parser, Debug)]
#[command(name = "repcount-tr")]
#[command(about = "Counts bicep curls from a recorded pose stream")]
#[command(version)]
struct Args {
    /// JSON-lines recording of pose results, one frame per line
    #[arg(short, long)]
    replay: PathBuf,

    /// Config file (overrides REPCOUNT_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User the workout is logged for
    #[arg(short, long, default_value = "local", env = "REPCOUNT_USER")]
    user: String,

    /// Write the workout log entry here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pace playback at this many frames per second (unpaced if omitted)
    #[arg(long)]
    fps: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG takes precedence over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting repcount tracker {}", BuildInfo::current());
    match resolve_config_path(args.config.as_deref()) {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        _ => info!("Config file: none (compiled defaults)"),
    }
    info!(
        "Thresholds: extended > {}°, flexed < {}°, min visibility {}",
        config.counter.extended_threshold_deg,
        config.counter.flexed_threshold_deg,
        config.counter.min_visibility
    );

    let events = EventBus::new(config.session.event_capacity);
    let registry = Arc::new(SessionRegistry::new(events.clone()));
    let runner = WorkoutRunner::new(config.counter.clone(), events.clone());

    let mut source = ReplaySource::open(&args.replay)
        .await
        .with_context(|| format!("Failed to open recording {}", args.replay.display()))?;
    if let Some(fps) = args.fps.filter(|fps| *fps > 0.0) {
        source = source.with_frame_interval(Duration::from_secs_f64(1.0 / fps));
    }

    // Subscribe before starting so the overlay sees SessionStarted
    let overlay_task = tokio::spawn(overlay_log(events.subscribe()));

    let handle = registry
        .start(&args.user)
        .await
        .context("Failed to start workout session")?;
    let session_id = handle.session_id();

    tokio::spawn(end_on_ctrl_c(Arc::clone(&registry), session_id));

    let report = runner
        .run(&mut source, &mut RecordedPose, &handle)
        .await
        .context("Workout session failed")?;

    let entry = registry
        .complete(session_id, &report.summary)
        .await
        .context("Failed to complete workout session")?;

    if let Err(e) = overlay_task.await {
        warn!("Overlay task ended abnormally: {}", e);
    }

    let json = serde_json::to_string_pretty(&entry)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json + "\n")
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Workout log written to {}", path.display());
        }
        None => println!("{}", json),
    }

    info!(
        "Workout logged at {}: {} reps, final stage '{}'",
        entry.date_label(),
        entry.reps,
        entry.stage_label()
    );

    if let StopReason::SourceFailed(reason) = report.stop_reason {
        bail!("Recording ended early: {}", reason);
    }
    Ok(())
}

/// Log the overlay text whenever it changes, until the session ends
async fn overlay_log(mut rx: tokio::sync::broadcast::Receiver<RepEvent>) {
    let mut tracker = OverlayTracker::new();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let ended = matches!(event, RepEvent::SessionEnded { .. });
                if let Some(text) = tracker.apply(&event) {
                    info!("[{}] {}", event.session_id(), text);
                }
                if ended {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Overlay fell behind, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// End the workout when Ctrl+C is pressed
async fn end_on_ctrl_c(registry: Arc<SessionRegistry>, session_id: Uuid) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, ending workout");
            if let Err(e) = registry.end(session_id).await {
                warn!("Could not end session {}: {}", session_id, e);
            }
        }
        Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
    }
}
