//! BroadcastSupervisor - one background task per broadcast.
//!
//! A broadcast only ever writes its own status row. Per-recipient send
//! errors are counted; a panic anywhere in the run ends it as `failed`.

use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::domain::broadcast::{Broadcast, BroadcastReport, BroadcastStatus};
use crate::domain::foundation::{BroadcastId, DomainError};
use crate::ports::{BroadcastStore, MessageSender};

pub enum StartBroadcast {
    /// Resolves to the terminal status once the run ends.
    Started(JoinHandle<BroadcastStatus>),
    AlreadyRunning,
    NotFound,
    /// Broadcast already reached a terminal status.
    Finished(BroadcastStatus),
}

impl std::fmt::Debug for StartBroadcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartBroadcast::Started(_) => f.write_str("Started"),
            StartBroadcast::AlreadyRunning => f.write_str("AlreadyRunning"),
            StartBroadcast::NotFound => f.write_str("NotFound"),
            StartBroadcast::Finished(status) => write!(f, "Finished({})", status),
        }
    }
}

#[derive(Clone)]
pub struct BroadcastSupervisor {
    store: Arc<dyn BroadcastStore>,
    sender: Arc<dyn MessageSender>,
    send_delay: Duration,
    running: Arc<Mutex<HashSet<BroadcastId>>>,
}

/// Releases the running slot when the task ends, panicked or not.
struct RunningSlot {
    running: Arc<Mutex<HashSet<BroadcastId>>>,
    id: BroadcastId,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        lock(&self.running).remove(&self.id);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl BroadcastSupervisor {
    pub fn new(
        store: Arc<dyn BroadcastStore>,
        sender: Arc<dyn MessageSender>,
        send_delay: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            send_delay,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_running(&self, id: BroadcastId) -> bool {
        lock(&self.running).contains(&id)
    }

    pub async fn start(&self, id: BroadcastId) -> Result<StartBroadcast, DomainError> {
        let Some(broadcast) = self.store.find(id).await? else {
            return Ok(StartBroadcast::NotFound);
        };
        if broadcast.status.is_terminal() {
            return Ok(StartBroadcast::Finished(broadcast.status));
        }

        if !lock(&self.running).insert(id) {
            tracing::debug!(broadcast_id = %id, "Broadcast already running");
            return Ok(StartBroadcast::AlreadyRunning);
        }
        let slot = RunningSlot {
            running: self.running.clone(),
            id,
        };

        let store = self.store.clone();
        let sender = self.sender.clone();
        let delay = self.send_delay;
        let handle = tokio::spawn(async move {
            let _slot = slot;
            let run = AssertUnwindSafe(deliver(&store, &sender, delay, &broadcast)).catch_unwind();
            let (status, report) = match run.await {
                Ok(Ok(report)) => (BroadcastStatus::Completed, Some(report)),
                Ok(Err(err)) => {
                    tracing::error!(broadcast_id = %id, error = %err, "Broadcast aborted");
                    (BroadcastStatus::Failed, None)
                }
                Err(_) => {
                    tracing::error!(broadcast_id = %id, "Broadcast task panicked");
                    (BroadcastStatus::Failed, None)
                }
            };
            if let Err(err) = store.set_status(id, status, report).await {
                tracing::error!(broadcast_id = %id, error = %err, "Failed to record broadcast status");
            }
            status
        });

        Ok(StartBroadcast::Started(handle))
    }
}

async fn deliver(
    store: &Arc<dyn BroadcastStore>,
    sender: &Arc<dyn MessageSender>,
    delay: Duration,
    broadcast: &Broadcast,
) -> Result<BroadcastReport, DomainError> {
    store
        .set_status(broadcast.id, BroadcastStatus::Running, None)
        .await?;

    let mut report = BroadcastReport::default();
    for (i, recipient) in broadcast.recipients.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match sender.send(*recipient, &broadcast.message).await {
            Ok(()) => report.sent += 1,
            Err(err) => {
                report.failed += 1;
                tracing::debug!(
                    broadcast_id = %broadcast.id,
                    recipient = %recipient,
                    error = %err,
                    "Broadcast delivery failed"
                );
            }
        }
    }

    tracing::info!(
        broadcast_id = %broadcast.id,
        sent = report.sent,
        failed = report.failed,
        "Broadcast completed"
    );
    Ok(report)
}
