//! Asynchronous base ledger broadcast queue
//!
//! Callers hand signed transactions to the queue and return immediately. A
//! single worker task sends raw transactions in submission order, then
//! watches each receipt on its own task so an unmined transaction never holds
//! back later sends. Outcomes never reach the caller that enqueued them; they
//! are logged and kept as a bounded backlog of events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::primitives::B256;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::rpc::{BaseLedgerRpc, LedgerReceipt};
use super::signer::SignedTransaction;
use crate::config::BroadcastConfig;
use crate::error::{Result, SdkError};

/// Outcome of one queued transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEvent {
    /// Mined successfully
    Confirmed {
        tx_hash: B256,
        block_number: Option<u64>,
    },
    /// Mined, but execution reverted
    Reverted { tx_hash: B256 },
    /// Submission failed or no receipt arrived in time
    Failed { tx_hash: B256, reason: String },
    /// Already submitted by an external wallet, nothing to send
    Delegated { tx_hash: B256 },
}

impl BroadcastEvent {
    pub fn tx_hash(&self) -> B256 {
        match self {
            BroadcastEvent::Confirmed { tx_hash, .. }
            | BroadcastEvent::Reverted { tx_hash }
            | BroadcastEvent::Failed { tx_hash, .. }
            | BroadcastEvent::Delegated { tx_hash } => *tx_hash,
        }
    }
}

/// Shared by the worker and its receipt watchers
#[derive(Clone)]
struct Outcomes {
    events: mpsc::Sender<BroadcastEvent>,
    pending: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl Outcomes {
    fn report(&self, event: BroadcastEvent) {
        match &event {
            BroadcastEvent::Confirmed {
                tx_hash,
                block_number,
            } => info!("L1 transaction {} confirmed in block {:?}", tx_hash, block_number),
            BroadcastEvent::Reverted { tx_hash } => {
                error!("L1 transaction {} reverted", tx_hash)
            }
            BroadcastEvent::Failed { tx_hash, reason } => {
                error!("L1 transaction {} failed: {}", tx_hash, reason)
            }
            BroadcastEvent::Delegated { tx_hash } => {
                debug!("L1 transaction {} submitted by external wallet", tx_hash)
            }
        }

        self.pending.fetch_sub(1, Ordering::SeqCst);
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Broadcast event backlog full, dropping outcome of {}",
                    event.tx_hash()
                );
            }
            // Queue handle gone, nobody can read it
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

pub struct BroadcastQueue {
    intake: Mutex<Option<mpsc::UnboundedSender<SignedTransaction>>>,
    event_rx: Mutex<mpsc::Receiver<BroadcastEvent>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    dropped: Arc<AtomicUsize>,
}

impl BroadcastQueue {
    /// Create the queue and spawn its worker on the current runtime
    pub fn start(rpc: Arc<dyn BaseLedgerRpc>, settings: BroadcastConfig) -> Self {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(settings.event_capacity.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));

        let outcomes = Outcomes {
            events: event_tx,
            pending: pending.clone(),
            dropped: dropped.clone(),
        };
        let worker = tokio::spawn(Self::worker_loop(rpc, settings, intake_rx, outcomes));

        Self {
            intake: Mutex::new(Some(intake_tx)),
            event_rx: Mutex::new(event_rx),
            worker: Mutex::new(Some(worker)),
            pending,
            dropped,
        }
    }

    /// Queue a transaction for submission. Never fails: a closed queue is
    /// logged and the transaction dropped.
    pub async fn enqueue(&self, tx: SignedTransaction) {
        let intake = self.intake.lock().await;
        let Some(sender) = intake.as_ref() else {
            warn!("{}: dropping transaction {}", SdkError::QueueClosed, tx.tx_hash());
            return;
        };

        let tx_hash = tx.tx_hash();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(tx).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!("{}: dropping transaction {}", SdkError::QueueClosed, tx_hash);
            return;
        }
        debug!("Enqueued transaction {}", tx_hash);
    }

    /// Transactions accepted but without an outcome yet
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Outcomes discarded because the event backlog was full
    pub fn dropped_events(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Poll for broadcast outcomes (non-blocking)
    pub async fn poll_events(&self) -> Option<BroadcastEvent> {
        self.event_rx.lock().await.try_recv().ok()
    }

    /// Wait for the next outcome. `None` once the worker has stopped and
    /// every outcome was read.
    pub async fn next_event(&self) -> Option<BroadcastEvent> {
        self.event_rx.lock().await.recv().await
    }

    /// Stop accepting work and wait until everything queued has an outcome
    pub async fn shutdown(&self) {
        self.intake.lock().await.take();

        let worker = self.worker.lock().await.take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!("Broadcast worker ended abnormally: {}", e);
            }
        }
        info!("Broadcast queue drained");
    }

    async fn worker_loop(
        rpc: Arc<dyn BaseLedgerRpc>,
        settings: BroadcastConfig,
        mut intake: mpsc::UnboundedReceiver<SignedTransaction>,
        outcomes: Outcomes,
    ) {
        let settings = Arc::new(settings);
        let permits = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));
        let mut watchers = JoinSet::new();

        loop {
            tokio::select! {
                Some(joined) = watchers.join_next(), if !watchers.is_empty() => {
                    if let Err(e) = joined {
                        error!("Receipt watcher ended abnormally: {}", e);
                    }
                }
                next = intake.recv() => {
                    let Some(tx) = next else { break };

                    let (tx_hash, raw) = match tx {
                        SignedTransaction::Delegated { tx_hash, .. } => {
                            outcomes.report(BroadcastEvent::Delegated { tx_hash });
                            continue;
                        }
                        SignedTransaction::Local { tx_hash, raw, .. } => (tx_hash, raw),
                    };

                    // Bounds how many receipts are watched at once
                    let permit = match permits.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            outcomes.report(BroadcastEvent::Failed {
                                tx_hash,
                                reason: e.to_string(),
                            });
                            continue;
                        }
                    };

                    if let Err(e) = rpc.send_raw_transaction(&raw).await {
                        outcomes.report(BroadcastEvent::Failed {
                            tx_hash,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                    debug!("Submitted transaction {}", tx_hash);

                    let rpc = rpc.clone();
                    let settings = settings.clone();
                    let outcomes = outcomes.clone();
                    watchers.spawn(async move {
                        let event = Self::confirm(rpc.as_ref(), &settings, tx_hash).await;
                        drop(permit);
                        outcomes.report(event);
                    });
                }
            }
        }

        while let Some(joined) = watchers.join_next().await {
            if let Err(e) = joined {
                error!("Receipt watcher ended abnormally: {}", e);
            }
        }
        debug!("Broadcast worker stopped");
    }

    async fn confirm(
        rpc: &dyn BaseLedgerRpc,
        settings: &BroadcastConfig,
        tx_hash: B256,
    ) -> BroadcastEvent {
        match Self::await_receipt(rpc, settings, tx_hash).await {
            Ok(Some(receipt)) if receipt.success => BroadcastEvent::Confirmed {
                tx_hash,
                block_number: receipt.block_number,
            },
            Ok(Some(_)) => BroadcastEvent::Reverted { tx_hash },
            Ok(None) => BroadcastEvent::Failed {
                tx_hash,
                reason: format!(
                    "no receipt after {} polls",
                    settings.receipt_poll_attempts
                ),
            },
            Err(e) => BroadcastEvent::Failed {
                tx_hash,
                reason: e.to_string(),
            },
        }
    }

    async fn await_receipt(
        rpc: &dyn BaseLedgerRpc,
        settings: &BroadcastConfig,
        tx_hash: B256,
    ) -> Result<Option<LedgerReceipt>> {
        for attempt in 0..settings.receipt_poll_attempts.max(1) {
            if let Some(receipt) = rpc.transaction_receipt(tx_hash).await? {
                return Ok(Some(receipt));
            }
            debug!("No receipt yet for {} (poll {})", tx_hash, attempt + 1);
            tokio::time::sleep(settings.receipt_poll_interval()).await;
        }
        Ok(None)
    }
}
