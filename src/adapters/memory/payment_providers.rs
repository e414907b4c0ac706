//! Scripted card and crypto processors.
//!
//! Remote state is whatever the test configured; every call is logged.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::{
    CardPayment, CardPaymentProvider, CardPaymentStatus, ChargeSavedMethod, CreateCardPayment,
    CreateCryptoInvoice, CryptoInvoice, CryptoInvoiceStatus, CryptoPaymentProvider,
    PaymentError,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ════════════════════════════════════════════════════════════════════════════
// Card
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCall {
    Get(String),
    Create(CreateCardPayment),
    Charge(ChargeSavedMethod),
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedCardProvider {
    inner: Arc<Mutex<CardState>>,
}

#[derive(Debug, Default)]
struct CardState {
    payments: HashMap<String, CardPayment>,
    get_errors: VecDeque<PaymentError>,
    charge_results: VecDeque<Result<CardPayment, PaymentError>>,
    calls: Vec<CardCall>,
    next_id: u64,
}

impl ScriptedCardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what `get_payment(id)` reports.
    pub fn set_payment(&self, payment: CardPayment) {
        lock(&self.inner).payments.insert(payment.id.clone(), payment);
    }

    /// Queues errors returned by the next `get_payment` calls, in order.
    pub fn push_get_error(&self, error: PaymentError) {
        lock(&self.inner).get_errors.push_back(error);
    }

    /// Queues the outcome of the next `charge_saved_method`.
    pub fn push_charge_result(&self, result: Result<CardPayment, PaymentError>) {
        lock(&self.inner).charge_results.push_back(result);
    }

    pub fn calls(&self) -> Vec<CardCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn charge_count(&self) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|c| matches!(c, CardCall::Charge(_)))
            .count()
    }

    pub fn get_count(&self) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|c| matches!(c, CardCall::Get(_)))
            .count()
    }
}

#[async_trait]
impl CardPaymentProvider for ScriptedCardProvider {
    async fn get_payment(&self, payment_id: &str) -> Result<CardPayment, PaymentError> {
        let mut state = lock(&self.inner);
        state.calls.push(CardCall::Get(payment_id.to_string()));
        if let Some(err) = state.get_errors.pop_front() {
            return Err(err);
        }
        state
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("payment"))
    }

    async fn create_payment(
        &self,
        request: CreateCardPayment,
    ) -> Result<CardPayment, PaymentError> {
        let mut state = lock(&self.inner);
        state.next_id += 1;
        let payment = CardPayment {
            id: format!("card-{}", state.next_id),
            status: CardPaymentStatus::Pending,
            paid: false,
            cancellation_reason: None,
            payment_method: None,
            confirmation_url: Some(format!("https://pay.example/confirm/{}", state.next_id)),
        };
        state.payments.insert(payment.id.clone(), payment.clone());
        state.calls.push(CardCall::Create(request));
        Ok(payment)
    }

    async fn charge_saved_method(
        &self,
        request: ChargeSavedMethod,
    ) -> Result<CardPayment, PaymentError> {
        let mut state = lock(&self.inner);
        state.calls.push(CardCall::Charge(request));
        state.next_id += 1;
        let next_id = state.next_id;
        state.charge_results.pop_front().unwrap_or_else(|| {
            Ok(CardPayment {
                id: format!("card-{}", next_id),
                status: CardPaymentStatus::Succeeded,
                paid: true,
                cancellation_reason: None,
                payment_method: None,
                confirmation_url: None,
            })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Crypto
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ScriptedCryptoProvider {
    inner: Arc<Mutex<CryptoState>>,
}

#[derive(Debug, Default)]
struct CryptoState {
    invoices: HashMap<String, CryptoInvoice>,
    next_error: Option<PaymentError>,
    batches: Vec<Vec<String>>,
    next_id: u64,
}

impl ScriptedCryptoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, invoice_id: &str, status: CryptoInvoiceStatus) {
        lock(&self.inner).invoices.insert(
            invoice_id.to_string(),
            CryptoInvoice {
                invoice_id: invoice_id.to_string(),
                status,
                pay_url: None,
            },
        );
    }

    pub fn fail_next(&self, error: PaymentError) {
        lock(&self.inner).next_error = Some(error);
    }

    /// Id lists passed to each `get_invoices` call.
    pub fn batches(&self) -> Vec<Vec<String>> {
        lock(&self.inner).batches.clone()
    }
}

#[async_trait]
impl CryptoPaymentProvider for ScriptedCryptoProvider {
    async fn get_invoices(
        &self,
        invoice_ids: &[String],
    ) -> Result<Vec<CryptoInvoice>, PaymentError> {
        let mut state = lock(&self.inner);
        state.batches.push(invoice_ids.to_vec());
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        Ok(invoice_ids
            .iter()
            .filter_map(|id| state.invoices.get(id).cloned())
            .collect())
    }

    async fn create_invoice(
        &self,
        _request: CreateCryptoInvoice,
    ) -> Result<CryptoInvoice, PaymentError> {
        let mut state = lock(&self.inner);
        state.next_id += 1;
        let invoice = CryptoInvoice {
            invoice_id: state.next_id.to_string(),
            status: CryptoInvoiceStatus::Active,
            pay_url: Some(format!("https://crypto.example/invoice/{}", state.next_id)),
        };
        state
            .invoices
            .insert(invoice.invoice_id.clone(), invoice.clone());
        Ok(invoice)
    }
}
