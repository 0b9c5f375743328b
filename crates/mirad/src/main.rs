//! Mira assistant daemon entry point.
//!
//! Wires the device channel, memory store, monitor loop, periodic flush,
//! evolution engine and the interactive console together, then waits for
//! the console to end and drains the monitor before exiting.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mira_common::{paths, MemoryStore};
use mirad::config;
use mirad::console::Console;
use mirad::device::{AdbBridge, DeviceChannel};
use mirad::evolution::EvolutionEngine;
use mirad::monitor::NotificationMonitor;
use mirad::responder::RuleBasedResponder;
use mirad::shutdown::ShutdownSignal;
use mirad::voice::VoiceSystem;

/// Longest the exit path waits for the monitor to finish its cycle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("[BOOT] mira assistant v{} starting", env!("CARGO_PKG_VERSION"));

    let config = config::load().context("load configuration")?;
    info!("[BOOT] config loaded");

    let store = Arc::new(MemoryStore::open(paths::memory_file()));
    info!(
        "[BOOT] memory ready ({} conversations, {} notifications)",
        store.conversation_count(),
        store.notification_count()
    );

    let bridge = Arc::new(AdbBridge::new(&config.device));
    match bridge.connect().await {
        Ok(()) => info!("[BOOT] device connected at {}", config.device.adb_host),
        Err(err) => {
            warn!("[BOOT] adb connect failed ({err}), retrying once");
            if let Err(err) = bridge.connect().await {
                warn!("[BOOT] device still unreachable ({err}), monitor will keep polling");
            } else {
                info!("[BOOT] device connected at {}", config.device.adb_host);
            }
        }
    }
    let device: Arc<dyn DeviceChannel> = bridge;

    let voice = Arc::new(VoiceSystem::new(&config.voice));
    let shutdown = ShutdownSignal::new();

    let monitor = NotificationMonitor::new(
        device.clone(),
        voice.clone(),
        store.clone(),
        config.monitor.clone(),
    );
    let monitor_task = tokio::spawn(monitor.run(shutdown.clone()));

    spawn_periodic_flush(store.clone(), config.memory.backup_interval());

    if config.evolution.enabled {
        let engine = EvolutionEngine::new(store.clone(), config.evolution.clone());
        tokio::spawn(engine.run());
    }

    info!("[READY] mira operational");

    let console = Console::new(device, store.clone(), RuleBasedResponder::new(store.clone()));
    if let Err(err) = console.run().await {
        error!("console failed: {err:#}");
    }

    info!("[SHUTDOWN] draining monitor");
    shutdown.signal();
    if tokio::time::timeout(SHUTDOWN_GRACE, monitor_task).await.is_err() {
        warn!("[SHUTDOWN] monitor did not stop within {SHUTDOWN_GRACE:?}, abandoning it");
    }
    if let Err(err) = store.flush() {
        error!("[SHUTDOWN] final flush failed: {err:#}");
    }
    if let Err(err) = store.write_critical_backup() {
        warn!("[SHUTDOWN] critical backup failed: {err:#}");
    }
    info!("[SHUTDOWN] goodbye");
    Ok(())
}

/// Flush the store on a fixed cadence so quiet periods still hit disk.
fn spawn_periodic_flush(store: Arc<MemoryStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.flush() {
                Ok(()) => debug!("periodic flush complete"),
                Err(err) => warn!("periodic flush failed: {err:#}"),
            }
        }
    });
}
