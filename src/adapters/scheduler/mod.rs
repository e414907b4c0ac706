//! ReconcileScheduler - periodic reconciliation passes.
//!
//! Each processor gets its own loop with its own interval. A failed pass
//! is logged and retried on the next tick; only the shutdown signal ends
//! the loop.
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a watch channel. A pass in progress is finished
//! before the loop exits; no extra pass runs after the signal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::handlers::{ReconcileCardHandler, ReconcileCryptoHandler, ReconcileReport};
use crate::domain::foundation::DomainError;

/// One reconciliation pass over a processor's pending purchases.
#[async_trait]
pub trait ReconcilePass: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_once(&self) -> Result<ReconcileReport, DomainError>;
}

#[async_trait]
impl ReconcilePass for ReconcileCardHandler {
    fn name(&self) -> &'static str {
        "card"
    }

    async fn run_once(&self) -> Result<ReconcileReport, DomainError> {
        ReconcileCardHandler::run_once(self).await
    }
}

#[async_trait]
impl ReconcilePass for ReconcileCryptoHandler {
    fn name(&self) -> &'static str {
        "crypto"
    }

    async fn run_once(&self) -> Result<ReconcileReport, DomainError> {
        ReconcileCryptoHandler::run_once(self).await
    }
}

pub struct ReconcileScheduler {
    pass: Arc<dyn ReconcilePass>,
    interval: Duration,
}

impl ReconcileScheduler {
    pub fn new(pass: Arc<dyn ReconcilePass>, interval: Duration) -> Self {
        Self { pass, interval }
    }

    /// Run passes until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        // a slow pass delays the next one instead of triggering a burst
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            processor = self.pass.name(),
            interval_secs = self.interval.as_secs(),
            "Reconciliation loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(processor = self.pass.name(), "Reconciliation loop stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Run exactly one pass, logging its outcome.
    pub async fn tick(&self) -> Option<ReconcileReport> {
        match self.pass.run_once().await {
            Ok(report) => {
                if report.paid > 0 || report.cancelled > 0 || report.failed > 0 {
                    tracing::info!(
                        processor = self.pass.name(),
                        checked = report.checked,
                        paid = report.paid,
                        cancelled = report.cancelled,
                        failed = report.failed,
                        "Reconciliation pass settled purchases"
                    );
                } else {
                    tracing::debug!(
                        processor = self.pass.name(),
                        checked = report.checked,
                        "Reconciliation tick"
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::warn!(
                    processor = self.pass.name(),
                    error = %e,
                    "Reconciliation pass failed; retrying next tick"
                );
                None
            }
        }
    }
}
