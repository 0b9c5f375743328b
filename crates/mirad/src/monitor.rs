//! Notification monitor loop.
//!
//! Polls the device on a fixed cadence, sifts each dump for records that were
//! not in the previous one, and dispatches the planned actions per record.
//! A failed cycle extends the next sleep; nothing short of the shutdown
//! signal stops the loop, and one bad record never blocks the ones after it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use mira_common::{fresh_records, parse_notification_dump, MemoryStore, NotificationRecord, Snapshot};
use mira_common::parsers::power::ScreenState;

use crate::config::MonitorConfig;
use crate::device::{self, DeviceChannel};
use crate::policy;
use crate::shutdown::ShutdownSignal;
use crate::voice::VoiceSystem;

/// Loop phases. There is no terminal phase; shutdown is an external signal
/// observed at the cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Polling,
    Processing,
    Sleeping,
}

impl MonitorPhase {
    /// Successor phase in a clean cycle; `Sleeping` wraps around to
    /// `Polling`.
    pub fn next(self) -> MonitorPhase {
        match self {
            MonitorPhase::Idle => MonitorPhase::Polling,
            MonitorPhase::Polling => MonitorPhase::Processing,
            MonitorPhase::Processing => MonitorPhase::Sleeping,
            MonitorPhase::Sleeping => MonitorPhase::Polling,
        }
    }
}

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Clean,
    Failed,
}

/// The single source of inter-cycle delays.
pub fn backoff(outcome: CycleOutcome, cfg: &MonitorConfig) -> Duration {
    match outcome {
        CycleOutcome::Clean => cfg.poll_interval(),
        CycleOutcome::Failed => cfg.error_backoff(),
    }
}

pub struct NotificationMonitor {
    device: Arc<dyn DeviceChannel>,
    voice: Arc<VoiceSystem>,
    store: Arc<MemoryStore>,
    cfg: MonitorConfig,
    previous: Snapshot,
    phase: MonitorPhase,
}

impl NotificationMonitor {
    pub fn new(
        device: Arc<dyn DeviceChannel>,
        voice: Arc<VoiceSystem>,
        store: Arc<MemoryStore>,
        cfg: MonitorConfig,
    ) -> Self {
        Self {
            device,
            voice,
            store,
            cfg,
            previous: Vec::new(),
            phase: MonitorPhase::Idle,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Run until `shutdown` is signalled. The first poll treats everything
    /// on the device as new; there is no earlier snapshot to compare with.
    pub async fn run(mut self, shutdown: ShutdownSignal) {
        info!(
            "notification monitor started (poll every {:?})",
            self.cfg.poll_interval()
        );
        loop {
            if shutdown.is_signalled() {
                break;
            }
            self.phase = self.phase.next();
            let outcome = match self.run_cycle().await {
                Ok(()) => CycleOutcome::Clean,
                Err(err) => {
                    warn!("monitor cycle failed: {err:#}");
                    CycleOutcome::Failed
                }
            };
            self.phase = MonitorPhase::Sleeping;
            let delay = backoff(outcome, &self.cfg);
            debug!("phase {:?} for {delay:?}", self.phase);
            tokio::time::sleep(delay).await;
        }
        info!("notification monitor stopped");
    }

    /// One poll/process cycle. The previous snapshot is replaced only after
    /// a successful retrieval, so a failed cycle cannot make old
    /// notifications look new again.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let screen = self.device.screen_state().await;
        let dump = self
            .device
            .notification_dump()
            .await
            .context("retrieve notification dump")?;
        let current = parse_notification_dump(&dump);

        self.phase = MonitorPhase::Processing;
        let fresh = fresh_records(&self.previous, &current);
        if !fresh.is_empty() {
            info!("{} new notification(s), screen {}", fresh.len(), screen.as_str());
        }
        for record in &fresh {
            self.process_record(record, screen).await;
        }
        self.previous = current;
        Ok(())
    }

    /// Dispatch the planned actions for one record. Failures are logged per
    /// record and never propagate to the cycle.
    async fn process_record(&self, record: &NotificationRecord, screen: ScreenState) {
        debug!(
            "processing notification from {:?} ({:?})",
            record.title, record.package
        );
        let actions = policy::plan_actions(record, screen);
        if let Some(line) = &actions.spoken {
            if let Err(err) = self.voice.speak(line).await {
                warn!("could not speak notification: {err:#}");
            }
        }
        if let Some(reply) = &actions.reply {
            info!(
                "auto-replying to {} on {}: {}",
                reply.sender, reply.package, reply.text
            );
            device::send_reply(self.device.as_ref(), &reply.package, &reply.text).await;
        }
        self.store.add_notification(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_cycle_without_a_terminal_state() {
        assert_eq!(MonitorPhase::Idle.next(), MonitorPhase::Polling);
        assert_eq!(MonitorPhase::Polling.next(), MonitorPhase::Processing);
        assert_eq!(MonitorPhase::Processing.next(), MonitorPhase::Sleeping);
        assert_eq!(MonitorPhase::Sleeping.next(), MonitorPhase::Polling);
    }

    #[test]
    fn backoff_stretches_after_a_failure() {
        let cfg = MonitorConfig {
            poll_interval_secs: 2,
            error_backoff_secs: 5,
        };
        assert_eq!(backoff(CycleOutcome::Clean, &cfg), Duration::from_secs(2));
        assert_eq!(backoff(CycleOutcome::Failed, &cfg), Duration::from_secs(5));
    }
}
