//! Card processor adapter.
//!
//! Implements `CardPaymentProvider` over the processor's REST API.
//! Requests authenticate with the shop id and secret key as HTTP basic
//! auth. Every write carries an `Idempotence-Key` derived from the
//! purchase id and the operation, so retrying a write for the same
//! purchase can never create a second payment.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::domain::foundation::PurchaseId;
use crate::ports::{
    CardPayment, CardPaymentProvider, ChargeSavedMethod, CreateCardPayment, PaymentError,
};

use super::wire_types::{
    Amount, ApiErrorBody, Confirmation, CreatePaymentBody, Metadata, Receipt, ReceiptCustomer,
    ReceiptItem, RemotePayment,
};

/// VAT code for goods without VAT.
const VAT_NONE: u8 = 1;

/// Stable key for one write on behalf of one purchase.
fn idempotence_key(operation: &str, purchase_id: PurchaseId) -> String {
    let name = format!("{}:{}", operation, purchase_id.as_i64());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Card processor configuration.
#[derive(Clone)]
pub struct CardProcessorConfig {
    shop_id: String,
    secret_key: SecretString,
    api_base_url: String,
    return_url: String,
    receipt_email: String,
    timeout: Duration,
}

impl CardProcessorConfig {
    pub fn new(
        shop_id: impl Into<String>,
        secret_key: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            shop_id: shop_id.into(),
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: "https://api.yookassa.ru/v3".to_string(),
            return_url: return_url.into(),
            receipt_email: "receipts@example.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_receipt_email(mut self, email: impl Into<String>) -> Self {
        self.receipt_email = email.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&PaymentConfig> for CardProcessorConfig {
    fn from(config: &PaymentConfig) -> Self {
        CardProcessorConfig::new(
            config.card_shop_id.clone(),
            config.card_secret_key.clone(),
            config.card_return_url.clone(),
        )
        .with_base_url(config.card_base_url.clone())
        .with_receipt_email(config.card_receipt_email.clone())
        .with_timeout(config.timeout())
    }
}

pub struct CardProcessorAdapter {
    config: CardProcessorConfig,
    http_client: reqwest::Client,
}

impl CardProcessorAdapter {
    pub fn new(config: CardProcessorConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn description(months: u32) -> String {
        format!("VPN subscription, {} month(s)", months)
    }

    fn receipt(&self, amount: Amount, months: u32) -> Receipt {
        Receipt {
            customer: ReceiptCustomer {
                email: self.config.receipt_email.clone(),
            },
            items: vec![ReceiptItem {
                description: Self::description(months),
                quantity: "1",
                amount,
                vat_code: VAT_NONE,
            }],
        }
    }

    async fn post_payment(
        &self,
        body: &CreatePaymentBody,
        purchase_id: PurchaseId,
        operation: &'static str,
    ) -> Result<CardPayment, PaymentError> {
        let url = format!("{}/payments", self.config.api_base_url);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.shop_id, Some(self.config.secret_key.expose_secret()))
            .header("Idempotence-Key", idempotence_key(operation, purchase_id))
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_payment(response, operation).await
    }

    async fn read_payment(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<CardPayment, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                operation,
                status = status.as_u16(),
                error = %error_text,
                "Card processor request failed"
            );
            let mut error = PaymentError::from_status(
                status.as_u16(),
                format!("Card processor error: {}", error_text),
            );
            if let Ok(body) = serde_json::from_str::<ApiErrorBody>(&error_text) {
                if let Some(code) = body.code {
                    error = error.with_provider_code(code);
                }
                if let Some(description) = body.description {
                    error.message = format!("Card processor error: {}", description);
                }
            }
            return Err(error);
        }

        let remote: RemotePayment = response.json().await.map_err(|e| {
            PaymentError::invalid_response(format!("Failed to parse card payment: {}", e))
        })?;
        CardPayment::try_from(remote).map_err(PaymentError::invalid_response)
    }
}

#[async_trait]
impl CardPaymentProvider for CardProcessorAdapter {
    async fn get_payment(&self, payment_id: &str) -> Result<CardPayment, PaymentError> {
        let url = format!("{}/payments/{}", self.config.api_base_url, payment_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.config.shop_id, Some(self.config.secret_key.expose_secret()))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::read_payment(response, "get_payment").await
    }

    async fn create_payment(
        &self,
        request: CreateCardPayment,
    ) -> Result<CardPayment, PaymentError> {
        let amount = Amount::whole(request.amount, request.currency);
        let body = CreatePaymentBody {
            amount: amount.clone(),
            capture: true,
            description: Self::description(request.months),
            metadata: Metadata {
                purchase_id: request.purchase_id.as_i64(),
                external_id: request.external_id.as_i64(),
                months: request.months,
            },
            receipt: self.receipt(amount, request.months),
            confirmation: Some(Confirmation {
                kind: "redirect",
                return_url: self.config.return_url.clone(),
            }),
            save_payment_method: request.save_payment_method,
            payment_method_id: None,
        };

        let payment = self.post_payment(&body, request.purchase_id, "create_payment").await?;
        tracing::info!(
            purchase_id = %request.purchase_id,
            payment_id = %payment.id,
            save_payment_method = request.save_payment_method,
            "Card payment created"
        );
        Ok(payment)
    }

    async fn charge_saved_method(
        &self,
        request: ChargeSavedMethod,
    ) -> Result<CardPayment, PaymentError> {
        let amount = Amount::whole(request.amount, request.currency);
        let body = CreatePaymentBody {
            amount: amount.clone(),
            capture: true,
            description: Self::description(request.months),
            metadata: Metadata {
                purchase_id: request.purchase_id.as_i64(),
                external_id: request.external_id.as_i64(),
                months: request.months,
            },
            receipt: self.receipt(amount, request.months),
            confirmation: None,
            save_payment_method: false,
            payment_method_id: Some(request.payment_method_id),
        };

        let payment = self.post_payment(&body, request.purchase_id, "charge_saved_method").await?;
        tracing::info!(
            purchase_id = %request.purchase_id,
            payment_id = %payment.id,
            status = ?payment.status,
            "Saved payment method charged"
        );
        Ok(payment)
    }
}
