//! `SyncEngine`: tails the registry change-log and keeps the cache current.
//!
//! `start` spawns one task that applies every record it reads. The call
//! returns once the task has seen the first end-of-partition marker (the
//! retained log has been replayed), or fails if that does not happen within
//! `startup_timeout_ms`. The task then keeps applying live updates until the
//! returned `SyncHandle` is shut down or dropped.

use crate::apply::{apply_record, ApplyOutcome};
use crate::config::SyncConfig;
use crate::consumer::{ChangeLogConsumer, LogEvent, LogStream};
use avrosync_core::error::SyncError;
use avrosync_registry::SchemaCache;
use futures::StreamExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    /// Replaying the retained log
    CatchingUp,
    /// Caught up, applying live updates
    Live,
    Stopped,
    /// The transport failed; the cache keeps what it had
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CatchingUp => "catching up",
            Self::Live => "live",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of the engine's progress.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncHealth {
    pub state: SyncState,
    /// Offset of the last record read
    pub last_offset: Option<i64>,
    pub records_applied: u64,
    pub records_skipped: u64,
    pub last_error: Option<String>,
}

type SharedHealth = Arc<Mutex<SyncHealth>>;

fn lock(health: &SharedHealth) -> MutexGuard<'_, SyncHealth> {
    health.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct SyncEngine {
    config: SyncConfig,
    cache: SchemaCache,
    consumer: Arc<dyn ChangeLogConsumer>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, cache: SchemaCache, consumer: Arc<dyn ChangeLogConsumer>) -> Self {
        Self {
            config,
            cache,
            consumer,
        }
    }

    /// Replay the change-log and keep following it in the background.
    pub async fn start(self) -> Result<SyncHandle, SyncError> {
        self.start_until(std::future::pending::<()>()).await
    }

    /// Like `start`, but gives up with `SyncError::Cancelled` as soon as
    /// `cancel` completes during catch-up.
    pub async fn start_until<F>(self, cancel: F) -> Result<SyncHandle, SyncError>
    where
        F: Future<Output = ()>,
    {
        let health: SharedHealth = Arc::default();
        let stream = self
            .consumer
            .consume(&self.config.topic, self.config.partition, self.config.start_offset)
            .await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let (synced_tx, synced_rx) = oneshot::channel();
        lock(&health).state = SyncState::CatchingUp;

        info!(
            topic = %self.config.topic,
            partition = self.config.partition,
            "background sync started, waiting for catch-up"
        );

        let task = tokio::spawn(run(
            stream,
            self.cache.clone(),
            Arc::clone(&health),
            stop_rx,
            synced_tx,
            self.config.log_snapshots,
        ));

        let ms = self.config.startup_timeout_ms;
        let caught_up = tokio::time::timeout(Duration::from_millis(ms), synced_rx);
        tokio::pin!(cancel);

        let result = tokio::select! {
            r = caught_up => match r {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => {
                    let reason = lock(&health)
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "change-log stream ended".into());
                    Err(SyncError::Interrupted { reason })
                }
                Err(_) => Err(SyncError::StartupTimeout { ms }),
            },
            _ = &mut cancel => Err(SyncError::Cancelled),
        };

        if let Err(e) = result {
            error!("background sync failed to start: {e}");
            let _ = stop_tx.send(true);
            let _ = task.await;
            let mut h = lock(&health);
            if h.state != SyncState::Failed {
                h.state = SyncState::Stopped;
            }
            return Err(e);
        }

        info!("background sync done");
        if self.config.log_snapshots {
            info!("schemas registered\n{}", self.cache.render_table());
        }

        Ok(SyncHandle {
            stop: stop_tx,
            task,
            health,
        })
    }
}

/// Handle to a running engine. Dropping it stops the background task.
#[derive(Debug)]
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    health: SharedHealth,
}

impl SyncHandle {
    pub fn health(&self) -> SyncHealth {
        lock(&self.health).clone()
    }

    /// Stop the background task and wait for it to exit.
    pub async fn shutdown(self) -> SyncHealth {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!("sync task ended abnormally: {e}");
        }
        let mut h = lock(&self.health);
        if h.state != SyncState::Failed {
            h.state = SyncState::Stopped;
        }
        info!(
            applied = h.records_applied,
            skipped = h.records_skipped,
            "background sync stopped"
        );
        h.clone()
    }
}

async fn run(
    mut stream: LogStream,
    cache: SchemaCache,
    health: SharedHealth,
    mut stop: watch::Receiver<bool>,
    synced_tx: oneshot::Sender<()>,
    log_snapshots: bool,
) {
    let mut synced_tx = Some(synced_tx);

    loop {
        let event = tokio::select! {
            biased;
            // Err means the handle was dropped
            _ = stop.changed() => break,
            event = stream.next() => event,
        };

        match event {
            None => {
                warn!("change-log stream ended");
                let mut h = lock(&health);
                h.state = SyncState::Stopped;
                h.last_error = Some("change-log stream ended".into());
                break;
            }
            Some(Err(e)) => {
                error!("change-log transport error: {e}");
                let mut h = lock(&health);
                h.state = SyncState::Failed;
                h.last_error = Some(e.to_string());
                break;
            }
            Some(Ok(LogEvent::PartitionEnd { offset })) => {
                if let Some(tx) = synced_tx.take() {
                    debug!(offset, "reached end of change-log");
                    lock(&health).state = SyncState::Live;
                    let _ = tx.send(());
                }
            }
            Some(Ok(LogEvent::Record(record))) => {
                let outcome = apply_record(&cache, record.key.as_deref(), record.value.as_deref());
                {
                    let mut h = lock(&health);
                    h.last_offset = Some(record.offset);
                    match &outcome {
                        ApplyOutcome::Installed { .. } => h.records_applied += 1,
                        ApplyOutcome::Skipped(_) => h.records_skipped += 1,
                    }
                }

                match outcome {
                    ApplyOutcome::Installed { subject, version, id } if synced_tx.is_none() => {
                        info!(%subject, version, id, "registry updated");
                        if log_snapshots {
                            info!("schemas registered\n{}", cache.render_table());
                        }
                    }
                    ApplyOutcome::Skipped(reason) => {
                        debug!(offset = record.offset, %reason, "change-log record skipped");
                    }
                    _ => {}
                }
            }
        }
    }
}
