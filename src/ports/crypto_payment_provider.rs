//! Crypto processor port.

use async_trait::async_trait;

use crate::domain::foundation::{Currency, PurchaseId};

use super::PaymentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoInvoiceStatus {
    Active,
    Paid,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoInvoice {
    pub invoice_id: String,
    pub status: CryptoInvoiceStatus,
    pub pay_url: Option<String>,
}

/// A fiat-denominated invoice the customer settles in crypto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCryptoInvoice {
    pub purchase_id: PurchaseId,
    pub amount: i64,
    pub currency: Currency,
    pub description: String,
}

#[async_trait]
pub trait CryptoPaymentProvider: Send + Sync {
    /// One batched lookup over many invoice ids.
    async fn get_invoices(&self, invoice_ids: &[String])
        -> Result<Vec<CryptoInvoice>, PaymentError>;

    async fn create_invoice(
        &self,
        request: CreateCryptoInvoice,
    ) -> Result<CryptoInvoice, PaymentError>;
}
