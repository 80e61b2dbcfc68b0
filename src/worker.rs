//! Single-writer ingest worker for async hosts.
//!
//! Trade outcomes are queued on an mpsc channel and applied one at a time, so
//! producers on many tasks never interleave updates. An optional interval
//! fires the pruner.

use crate::domain::TradeOutcome;
use crate::error::{LedgerError, Result};
use crate::store::PatternStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Commands accepted by the ingest worker
#[derive(Debug)]
pub enum LedgerCommand {
    Record(TradeOutcome),
    Prune,
}

/// Counters returned when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub recorded: u64,
    pub skipped: u64,
    pub pruned: u64,
}

/// Cloneable producer side of the worker
#[derive(Debug, Clone)]
pub struct IngestHandle {
    tx: mpsc::Sender<LedgerCommand>,
}

impl IngestHandle {
    pub async fn record(&self, trade: TradeOutcome) -> Result<()> {
        self.send(LedgerCommand::Record(trade)).await
    }

    pub async fn prune(&self) -> Result<()> {
        self.send(LedgerCommand::Prune).await
    }

    async fn send(&self, cmd: LedgerCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| LedgerError::Internal("ingest worker stopped".to_string()))
    }
}

/// Spawn the worker. It exits once every `IngestHandle` is dropped.
pub fn spawn_ingest_worker(
    store: Arc<PatternStore>,
    prune_interval: Option<Duration>,
    buffer: usize,
) -> (IngestHandle, JoinHandle<IngestSummary>) {
    let (tx, mut rx) = mpsc::channel::<LedgerCommand>(buffer.max(1));

    let task = tokio::spawn(async move {
        let mut summary = IngestSummary::default();
        let mut timer = prune_interval.map(|every| {
            let mut t = tokio::time::interval(every);
            t.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            t
        });

        info!(mode = %store.mode(), ?prune_interval, "ingest worker started");

        loop {
            let cmd = match timer.as_mut() {
                Some(t) => tokio::select! {
                    cmd = rx.recv() => cmd,
                    _ = t.tick() => Some(LedgerCommand::Prune),
                },
                None => rx.recv().await,
            };

            let Some(cmd) = cmd else {
                break;
            };

            // Store calls may hit the disk; keep them off the async workers.
            let store = store.clone();
            let joined = tokio::task::spawn_blocking(move || match cmd {
                LedgerCommand::Record(trade) => {
                    if store.record_outcome(&trade).is_some() {
                        (1, 0, 0)
                    } else {
                        (0, 1, 0)
                    }
                }
                LedgerCommand::Prune => (0, 0, store.prune_old_patterns() as u64),
            })
            .await;

            match joined {
                Ok((recorded, skipped, pruned)) => {
                    summary.recorded += recorded;
                    summary.skipped += skipped;
                    summary.pruned += pruned;
                }
                Err(e) => error!(error = %e, "ingest command panicked"),
            }
        }

        debug!(?summary, "ingest worker stopped");
        summary
    });

    (IngestHandle { tx }, task)
}
