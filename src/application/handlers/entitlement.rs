//! EntitlementApplier - creates or extends the panel account behind a customer.
//!
//! The panel holds the authoritative expiry. Extension arithmetic always
//! starts from the expiry the panel reports, and the result is mirrored
//! into the customer store afterwards.

use std::sync::Arc;

use crate::domain::entitlement::{extended_expiry, initial_expiry, resolve_device_limit};
use crate::domain::foundation::{CustomerId, DomainError, ExternalId, Timestamp};
use crate::ports::{Clock, CreatePanelUser, CustomerRepository, UpdatePanelUser, VpnPanel};

/// One entitlement change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementGrant {
    pub customer_id: CustomerId,
    pub external_id: ExternalId,
    pub traffic_limit_bytes: i64,
    /// May be zero or negative; see [`extended_expiry`].
    pub days: i64,
    pub is_trial: bool,
    /// Device limit of the tariff or offer being granted, if any.
    pub device_limit: Option<u32>,
}

pub struct EntitlementApplier {
    panel: Arc<dyn VpnPanel>,
    customers: Arc<dyn CustomerRepository>,
    clock: Arc<dyn Clock>,
}

impl EntitlementApplier {
    pub fn new(
        panel: Arc<dyn VpnPanel>,
        customers: Arc<dyn CustomerRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            panel,
            customers,
            clock,
        }
    }

    /// Returns the account's new expiry.
    pub async fn create_or_update_user(
        &self,
        grant: EntitlementGrant,
    ) -> Result<Timestamp, DomainError> {
        let now = self.clock.now();

        let user = match self.panel.find_user(grant.external_id).await? {
            None => {
                let expire_at = initial_expiry(now, grant.days);
                self.panel
                    .create_user(CreatePanelUser {
                        external_id: grant.external_id,
                        username: panel_username(grant.external_id),
                        expire_at,
                        traffic_limit_bytes: grant.traffic_limit_bytes,
                        device_limit: grant.device_limit,
                        is_trial: grant.is_trial,
                    })
                    .await?
            }
            Some(existing) => {
                let expire_at = extended_expiry(existing.expire_at, now, grant.days);
                let device_limit = grant
                    .device_limit
                    .and_then(|limit| resolve_device_limit(existing.device_limit, limit));
                self.panel
                    .update_user(UpdatePanelUser {
                        uuid: existing.uuid,
                        expire_at,
                        traffic_limit_bytes: grant.traffic_limit_bytes,
                        device_limit,
                    })
                    .await?
            }
        };

        self.customers
            .update_expire_at(grant.customer_id, user.expire_at)
            .await?;

        tracing::info!(
            customer_id = %grant.customer_id,
            external_id = %grant.external_id,
            days = grant.days,
            expire_at = %user.expire_at,
            "Entitlement applied"
        );

        Ok(user.expire_at)
    }
}

fn panel_username(external_id: ExternalId) -> String {
    format!("tg_{}", external_id)
}
