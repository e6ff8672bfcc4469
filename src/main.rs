//! Connects to the battery and renders its telemetry until Ctrl+C.
//!
//! Usage: `wattread [CONFIG_PATH]`. Without a path, `wattread.toml` is read when it exists.
//! `WATTREAD_ADDRESS` overrides the configured device address.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

use wattread::render::{render_frame, CLEAR_SCREEN};
use wattread::{BleTransport, ChannelSink, Config, Session, SessionEvent, SessionState};

const DEFAULT_CONFIG_PATH: &str = "wattread.toml";
const ADDRESS_ENV: &str = "WATTREAD_ADDRESS";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let profile = config.profile();
    profile.validate().map_err(|e| anyhow!(e))?;

    info!("wattread v{} starting", env!("CARGO_PKG_VERSION"));

    let transport = BleTransport::new(profile.service)
        .await
        .context("failed to open bluetooth adapter")?;
    let (sink, mut events) = ChannelSink::new(config.monitor.status_buffer);
    let sink = Arc::new(sink);
    let (session, stop) = Session::new(transport, profile, sink.clone());
    let mut session_task = tokio::spawn(session.run());

    let mut summary = interval(Duration::from_secs(config.monitor.summary_interval_s));
    summary.set_missed_tick_behavior(MissedTickBehavior::Delay);
    summary.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                SessionEvent::Frame(frame) => {
                    if config.monitor.clear_screen {
                        print!("{CLEAR_SCREEN}");
                    }
                    print!("{}", render_frame(&frame));
                }
                SessionEvent::DecodeError(err) => warn!(%err, "decoding error"),
                SessionEvent::StateChange(SessionState::Active) => info!("starting monitor (Ctrl+C to stop)"),
                SessionEvent::StateChange(state) => info!(?state, "session state"),
            },
            _ = summary.tick() => {
                if let Some(reading) = sink.latest() {
                    info!(
                        "{:.2}V {:.1}W (SOC {}%) {} at {}",
                        reading.frame.total_voltage,
                        reading.frame.power(),
                        reading.frame.state_of_charge,
                        reading.frame.status,
                        reading.received_at.format("%H:%M:%S"),
                    );
                }
            }
            _ = &mut ctrl_c => {
                info!("exiting");
                stop.stop();
                break;
            }
            result = &mut session_task => {
                return match result? {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        error!(%err, "session ended");
                        Err(err.into())
                    }
                };
            }
        }
    }

    session_task.await??;
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("failed to load {path}"))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load {DEFAULT_CONFIG_PATH}"))?,
        None => Config::default(),
    };

    if let Ok(address) = std::env::var(ADDRESS_ENV) {
        if !address.trim().is_empty() {
            config.device.address = address;
        }
    }

    Ok(config)
}
