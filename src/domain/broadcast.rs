//! Broadcast run status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{BroadcastId, ExternalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BroadcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastStatus::Pending => "pending",
            BroadcastStatus::Running => "running",
            BroadcastStatus::Completed => "completed",
            BroadcastStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BroadcastStatus::Completed | BroadcastStatus::Failed)
    }
}

impl fmt::Display for BroadcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals recorded when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub sent: u32,
    pub failed: u32,
}

/// A message queued for delivery to many customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: BroadcastId,
    pub message: String,
    pub recipients: Vec<ExternalId>,
    pub status: BroadcastStatus,
}
