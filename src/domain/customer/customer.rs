//! Customer aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CodeId, CustomerId, ExternalId, Timestamp};
use crate::domain::offer::{Offer, OfferKind};

use super::RecurringBilling;

/// Winback offer snapshot plus when it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinbackOffer {
    pub sent_at: Timestamp,
    pub offer: Offer,
}

/// Tariff-promo offer snapshot plus the code it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoOffer {
    pub code_id: CodeId,
    pub offer: Offer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub external_id: ExternalId,
    pub expire_at: Option<Timestamp>,
    pub language: String,
    pub recurring: RecurringBilling,
    pub winback_offer: Option<WinbackOffer>,
    pub promo_offer: Option<PromoOffer>,
    pub trial_inactive_notified_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Customer {
    /// A customer as created on first interaction.
    pub fn new(id: CustomerId, external_id: ExternalId, language: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            external_id,
            expire_at: None,
            language: language.into(),
            recurring: RecurringBilling::default(),
            winback_offer: None,
            promo_offer: None,
            trial_inactive_notified_at: None,
            created_at: now,
        }
    }

    pub fn offer(&self, kind: OfferKind) -> Option<&Offer> {
        match kind {
            OfferKind::Winback => self.winback_offer.as_ref().map(|w| &w.offer),
            OfferKind::TariffPromo => self.promo_offer.as_ref().map(|p| &p.offer),
        }
    }

    pub fn has_active_winback(&self, now: Timestamp) -> bool {
        self.winback_offer
            .map(|w| w.offer.is_valid_at(now))
            .unwrap_or(false)
    }

    /// Replaces any earlier tariff-promo offer.
    pub fn set_promo_offer(&mut self, code_id: CodeId, offer: Offer) {
        self.promo_offer = Some(PromoOffer { code_id, offer });
    }

    pub fn set_winback_offer(&mut self, sent_at: Timestamp, offer: Offer) {
        self.winback_offer = Some(WinbackOffer { sent_at, offer });
    }

    pub fn clear_offer(&mut self, kind: OfferKind) {
        match kind {
            OfferKind::Winback => self.winback_offer = None,
            OfferKind::TariffPromo => self.promo_offer = None,
        }
    }

    pub fn is_subscription_active(&self, now: Timestamp) -> bool {
        self.expire_at.map(|e| e.is_after(&now)).unwrap_or(false)
    }
}
