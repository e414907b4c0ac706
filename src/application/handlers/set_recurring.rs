//! SetRecurringHandler - customer toggles recurring billing.

use std::sync::Arc;

use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::ports::CustomerRepository;

#[derive(Debug, Clone, Copy)]
pub struct SetRecurringCommand {
    pub customer_id: CustomerId,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRecurringResult {
    Updated { enabled: bool },
    /// Enabling needs a stored payment method from an earlier card payment.
    NoPaymentMethod,
}

pub struct SetRecurringHandler {
    customers: Arc<dyn CustomerRepository>,
}

impl SetRecurringHandler {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub async fn handle(&self, cmd: SetRecurringCommand) -> Result<SetRecurringResult, DomainError> {
        let customer = self
            .customers
            .find_by_id(cmd.customer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::CustomerNotFound,
                    format!("customer {} not found", cmd.customer_id),
                )
            })?;

        let mut recurring = customer.recurring;
        if cmd.enabled {
            if !recurring.enable() {
                return Ok(SetRecurringResult::NoPaymentMethod);
            }
        } else {
            recurring.disable();
        }
        self.customers
            .update_recurring(cmd.customer_id, &recurring)
            .await?;

        tracing::info!(customer_id = %cmd.customer_id, enabled = cmd.enabled, "Recurring toggled");
        Ok(SetRecurringResult::Updated {
            enabled: cmd.enabled,
        })
    }
}
