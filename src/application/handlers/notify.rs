//! Fire-and-log notification delivery shared by the handlers.

use crate::domain::customer::Customer;
use crate::domain::notification::Notification;
use crate::ports::{Notifier, Recipient};

pub(crate) fn recipient(customer: &Customer) -> Recipient {
    Recipient {
        external_id: customer.external_id,
        language: customer.language.clone(),
    }
}

/// Sends one notification; a delivery failure is logged and swallowed.
pub(crate) async fn notify(notifier: &dyn Notifier, customer: &Customer, notification: Notification) {
    let to = recipient(customer);
    if let Err(err) = notifier.notify(&to, &notification).await {
        tracing::warn!(
            external_id = %to.external_id,
            key = notification.i18n_key(),
            error = %err,
            "Notification delivery failed"
        );
    }
}
