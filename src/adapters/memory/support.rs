//! Recording notifier, fixed clock and in-memory broadcast adapters.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::broadcast::{Broadcast, BroadcastReport, BroadcastStatus};
use crate::domain::foundation::{BroadcastId, DomainError, ErrorCode, ExternalId, Timestamp};
use crate::domain::notification::Notification;
use crate::ports::{BroadcastStore, Clock, MessageSender, Notifier, Recipient};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Notifier that keeps every notification instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Recipient, Notification)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Recipient, Notification)> {
        lock(&self.sent).clone()
    }

    pub fn sent_to(&self, external_id: ExternalId) -> Vec<Notification> {
        lock(&self.sent)
            .iter()
            .filter(|(r, _)| r.external_id == external_id)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipient: &Recipient,
        notification: &Notification,
    ) -> Result<(), DomainError> {
        lock(&self.sent).push((recipient.clone(), notification.clone()));
        Ok(())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<Timestamp>>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *lock(&self.now) = now;
    }

    pub fn advance_hours(&self, hours: i64) {
        let mut now = lock(&self.now);
        *now = now.add_hours(hours);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *lock(&self.now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBroadcastStore {
    inner: Arc<Mutex<BroadcastState>>,
}

#[derive(Debug, Default)]
struct BroadcastState {
    broadcasts: HashMap<BroadcastId, Broadcast>,
    reports: HashMap<BroadcastId, BroadcastReport>,
    history: Vec<(BroadcastId, BroadcastStatus)>,
}

impl InMemoryBroadcastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, broadcast: Broadcast) {
        lock(&self.inner).broadcasts.insert(broadcast.id, broadcast);
    }

    pub fn status(&self, id: BroadcastId) -> Option<BroadcastStatus> {
        lock(&self.inner).broadcasts.get(&id).map(|b| b.status)
    }

    pub fn report(&self, id: BroadcastId) -> Option<BroadcastReport> {
        lock(&self.inner).reports.get(&id).copied()
    }

    /// Every status written, in order.
    pub fn history(&self) -> Vec<(BroadcastId, BroadcastStatus)> {
        lock(&self.inner).history.clone()
    }
}

#[async_trait]
impl BroadcastStore for InMemoryBroadcastStore {
    async fn find(&self, id: BroadcastId) -> Result<Option<Broadcast>, DomainError> {
        Ok(lock(&self.inner).broadcasts.get(&id).cloned())
    }

    async fn set_status(
        &self,
        id: BroadcastId,
        status: BroadcastStatus,
        report: Option<BroadcastReport>,
    ) -> Result<(), DomainError> {
        let mut state = lock(&self.inner);
        let broadcast = state.broadcasts.get_mut(&id).ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, format!("broadcast {} not found", id))
        })?;
        broadcast.status = status;
        if let Some(report) = report {
            state.reports.insert(id, report);
        }
        state.history.push((id, status));
        Ok(())
    }
}

/// Message sender that records deliveries and can be told to fail or
/// panic for chosen recipients.
#[derive(Debug, Clone, Default)]
pub struct RecordingMessageSender {
    inner: Arc<Mutex<SenderState>>,
}

#[derive(Debug, Default)]
struct SenderState {
    delivered: Vec<ExternalId>,
    failing: HashSet<ExternalId>,
    panicking: HashSet<ExternalId>,
}

impl RecordingMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: ExternalId) {
        lock(&self.inner).failing.insert(recipient);
    }

    pub fn panic_for(&self, recipient: ExternalId) {
        lock(&self.inner).panicking.insert(recipient);
    }

    pub fn delivered(&self) -> Vec<ExternalId> {
        lock(&self.inner).delivered.clone()
    }
}

#[async_trait]
impl MessageSender for RecordingMessageSender {
    async fn send(&self, recipient: ExternalId, _message: &str) -> Result<(), DomainError> {
        let (fail, explode) = {
            let state = lock(&self.inner);
            (
                state.failing.contains(&recipient),
                state.panicking.contains(&recipient),
            )
        };
        if explode {
            panic!("simulated sender crash for {}", recipient);
        }
        if fail {
            return Err(DomainError::new(
                ErrorCode::NotifierError,
                format!("delivery to {} failed", recipient),
            ));
        }
        lock(&self.inner).delivered.push(recipient);
        Ok(())
    }
}
