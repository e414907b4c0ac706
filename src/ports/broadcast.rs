//! Broadcast ports: run bookkeeping and message delivery.
//!
//! Broadcasts share nothing with the ledger; a failing run can only
//! change its own status row.

use async_trait::async_trait;

use crate::domain::broadcast::{Broadcast, BroadcastReport, BroadcastStatus};
use crate::domain::foundation::{BroadcastId, DomainError, ExternalId};

#[async_trait]
pub trait BroadcastStore: Send + Sync {
    async fn find(&self, id: BroadcastId) -> Result<Option<Broadcast>, DomainError>;

    async fn set_status(
        &self,
        id: BroadcastId,
        status: BroadcastStatus,
        report: Option<BroadcastReport>,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: ExternalId, message: &str) -> Result<(), DomainError>;
}
