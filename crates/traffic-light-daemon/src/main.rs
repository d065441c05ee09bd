//! Traffic Light Daemon
//!
//! Polls the traffic light controller once per frame and exposes a JSON API
//! for mode and timing commands.

mod config;
mod state;
mod web;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    // Initialize application state
    let state = Arc::new(AppState::new(&config)?);

    // Bring the device in line with the persisted timings
    if state.is_connected() {
        state.sync_timings();
    }

    // Start frame loop
    let frame_state = state.clone();
    let frame_interval = config.frame_interval();
    tokio::spawn(async move {
        frame_loop(frame_state, frame_interval).await;
    });

    // Setup Unix signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    if config.web.enable {
        let app = web::create_router(state.clone());
        let addr: SocketAddr = config
            .web
            .listen
            .parse()
            .context("Invalid listen address")?;
        let listener = TcpListener::bind(addr).await?;
        info!("Web API listening on http://{}", addr);

        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    } else {
        info!("Web API disabled");
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
            }
        }
    }

    Ok(())
}

/// Minimum interval between repeated link-down warnings.
const LINK_WARN_INTERVAL: Duration = Duration::from_secs(60);

async fn frame_loop(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut skipped_frames: u64 = 0;
    let mut last_warn: Option<Instant> = None;

    loop {
        ticker.tick().await;

        if !state.is_connected() {
            skipped_frames += 1;
            let now = Instant::now();
            if should_warn(last_warn, now) {
                if skipped_frames > 1 {
                    warn!(
                        "Serial link down ({} frames without a device)",
                        skipped_frames
                    );
                } else {
                    warn!("Serial link down, frames are skipped until restart");
                }
                last_warn = Some(now);
            }
            continue;
        }
        skipped_frames = 0;

        let lines = state.poll_frame();
        if lines > 0 {
            trace!("Processed {} lines", lines);
        }
    }
}

/// Returns true on the first warning and then once per `LINK_WARN_INTERVAL`.
fn should_warn(last_warn: Option<Instant>, now: Instant) -> bool {
    match last_warn {
        Some(at) => now.saturating_duration_since(at) >= LINK_WARN_INTERVAL,
        None => true,
    }
}
