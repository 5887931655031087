//! Background reclamation of expired objects.
//!
//! The reaper runs as a single tokio task. It sweeps on a fixed interval and
//! also accepts commands over a channel, so callers can force a sweep (and get
//! its result) or shut it down cleanly.

use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{Instrument, debug, info, info_span, warn};

use super::errors::ReaperError;
use crate::{Result, Storage};

/// Interval used when none is configured.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Commands accepted by the reaper task.
#[derive(Debug)]
enum ReaperCommand {
    /// Sweep immediately and report how many objects were removed
    Sweep {
        response: oneshot::Sender<Result<u64>>,
    },
    /// Stop the task after the current iteration
    Shutdown,
}

/// Periodic sweep over all users' expired objects.
pub struct Reaper {
    storage: Storage,
    period: Duration,
    command_rx: mpsc::Receiver<ReaperCommand>,
}

impl Reaper {
    /// Spawn the reaper on the current tokio runtime.
    ///
    /// The first sweep happens immediately, then once per `period`.
    pub fn start(storage: Storage, period: Duration) -> ReaperHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let reaper = Reaper {
            storage,
            period,
            command_rx,
        };
        let task = tokio::spawn(reaper.run().instrument(info_span!("reaper")));
        ReaperHandle { command_tx, task }
    }

    async fn run(mut self) {
        info!(period_secs = self.period.as_secs(), "Reaper started");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        warn!(error = %e, "Scheduled sweep failed");
                    }
                }
                command = self.command_rx.recv() => match command {
                    Some(ReaperCommand::Sweep { response }) => {
                        let result = self.sweep().await;
                        // Requester may have given up waiting
                        let _ = response.send(result);
                    }
                    Some(ReaperCommand::Shutdown) | None => break,
                },
            }
        }

        info!("Reaper stopped");
    }

    async fn sweep(&self) -> Result<u64> {
        let removed = self.storage.purge_expired().await?;
        if removed > 0 {
            info!(removed, "Reclaimed expired objects");
        } else {
            debug!("No expired objects to reclaim");
        }
        Ok(removed)
    }
}

/// Handle to a running [`Reaper`].
#[derive(Debug)]
pub struct ReaperHandle {
    command_tx: mpsc::Sender<ReaperCommand>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Force a sweep now and return the number of objects removed.
    pub async fn sweep(&self) -> Result<u64> {
        let (response, rx) = oneshot::channel();
        self.command_tx
            .send(ReaperCommand::Sweep { response })
            .await
            .map_err(|_| ReaperError::Stopped)?;
        rx.await.map_err(|_| ReaperError::Stopped)?
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reaper and wait for the task to exit.
    pub async fn shutdown(self) -> Result<()> {
        // Ignore send failure: the task may already be gone, join below tells us
        let _ = self.command_tx.send(ReaperCommand::Shutdown).await;
        self.task.await.map_err(|e| ReaperError::TaskFailed {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
