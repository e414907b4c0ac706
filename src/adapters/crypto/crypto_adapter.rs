//! Crypto processor adapter.
//!
//! Every response is `{"ok": bool, "result" | "error": ...}`; an `ok: false`
//! body is mapped to a `PaymentError` even when the HTTP status is 200.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::PaymentConfig;
use crate::ports::{
    CreateCryptoInvoice, CryptoInvoice, CryptoInvoiceStatus, CryptoPaymentProvider, PaymentError,
};

const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";

#[derive(Clone)]
pub struct CryptoProcessorConfig {
    token: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl CryptoProcessorConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
            api_base_url: "https://pay.crypt.bot/api".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&PaymentConfig> for CryptoProcessorConfig {
    fn from(config: &PaymentConfig) -> Self {
        CryptoProcessorConfig::new(config.crypto_token.clone())
            .with_base_url(config.crypto_base_url.clone())
            .with_timeout(config.timeout())
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u16,
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvoicePage {
    items: Vec<RemoteInvoice>,
}

#[derive(Debug, Deserialize)]
struct RemoteInvoice {
    invoice_id: i64,
    status: String,
    #[serde(default)]
    bot_invoice_url: Option<String>,
}

impl TryFrom<RemoteInvoice> for CryptoInvoice {
    type Error = PaymentError;

    fn try_from(invoice: RemoteInvoice) -> Result<Self, Self::Error> {
        let status = match invoice.status.as_str() {
            "active" => CryptoInvoiceStatus::Active,
            "paid" => CryptoInvoiceStatus::Paid,
            "expired" => CryptoInvoiceStatus::Expired,
            other => {
                return Err(PaymentError::invalid_response(format!(
                    "unknown invoice status '{}'",
                    other
                )))
            }
        };
        Ok(CryptoInvoice {
            invoice_id: invoice.invoice_id.to_string(),
            status,
            pay_url: invoice.bot_invoice_url,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateInvoiceBody<'a> {
    currency_type: &'static str,
    fiat: &'static str,
    amount: String,
    description: &'a str,
    payload: String,
}

pub struct CryptoProcessorAdapter {
    config: CryptoProcessorConfig,
    http_client: reqwest::Client,
}

impl CryptoProcessorAdapter {
    pub fn new(config: CryptoProcessorConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        method: &'static str,
    ) -> Result<T, PaymentError> {
        let response = request
            .header(TOKEN_HEADER, self.config.token.expose_secret().as_str())
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ApiResponse<T>> = serde_json::from_str(&body).ok();

        match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) => Ok(result),
            Some(ApiResponse {
                error: Some(error), ..
            }) => {
                tracing::error!(method, code = error.code, name = %error.name, "Crypto processor rejected request");
                Err(PaymentError::from_status(
                    error.code,
                    format!("Crypto processor error: {}", error.name),
                )
                .with_provider_code(error.name))
            }
            _ if !status.is_success() => {
                tracing::error!(method, status = status.as_u16(), error = %body, "Crypto processor request failed");
                Err(PaymentError::from_status(
                    status.as_u16(),
                    format!("Crypto processor error: {}", body),
                ))
            }
            _ => Err(PaymentError::invalid_response(format!(
                "Failed to parse {} response",
                method
            ))),
        }
    }
}

#[async_trait]
impl CryptoPaymentProvider for CryptoProcessorAdapter {
    async fn get_invoices(
        &self,
        invoice_ids: &[String],
    ) -> Result<Vec<CryptoInvoice>, PaymentError> {
        if invoice_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/getInvoices", self.config.api_base_url);
        let ids = invoice_ids.join(",");
        let request = self
            .http_client
            .get(&url)
            .query(&[("invoice_ids", ids.as_str()), ("count", "1000")]);

        let page: InvoicePage = self.call(request, "getInvoices").await?;
        page.items.into_iter().map(CryptoInvoice::try_from).collect()
    }

    async fn create_invoice(
        &self,
        request: CreateCryptoInvoice,
    ) -> Result<CryptoInvoice, PaymentError> {
        let url = format!("{}/createInvoice", self.config.api_base_url);
        let body = CreateInvoiceBody {
            currency_type: "fiat",
            fiat: request.currency.as_str(),
            amount: request.amount.to_string(),
            description: &request.description,
            payload: request.purchase_id.to_string(),
        };

        let invoice: RemoteInvoice = self
            .call(self.http_client.post(&url).json(&body), "createInvoice")
            .await?;
        let invoice = CryptoInvoice::try_from(invoice)?;
        tracing::info!(
            purchase_id = %request.purchase_id,
            invoice_id = %invoice.invoice_id,
            "Crypto invoice created"
        );
        Ok(invoice)
    }
}
