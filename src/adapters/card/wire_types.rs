//! Card processor API objects.
//!
//! Amounts travel as decimal strings with two fractional digits.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Currency;
use crate::ports::{CancellationReason, CardPayment, CardPaymentStatus, SavedPaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    pub fn whole(amount: i64, currency: Currency) -> Self {
        Self {
            value: format!("{}.00", amount),
            currency: currency.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub return_url: String,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub purchase_id: i64,
    pub external_id: i64,
    pub months: u32,
}

#[derive(Debug, Serialize)]
pub struct ReceiptCustomer {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ReceiptItem {
    pub description: String,
    pub quantity: &'static str,
    pub amount: Amount,
    pub vat_code: u8,
}

#[derive(Debug, Serialize)]
pub struct Receipt {
    pub customer: ReceiptCustomer,
    pub items: Vec<ReceiptItem>,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentBody {
    pub amount: Amount,
    pub capture: bool,
    pub description: String,
    pub metadata: Metadata,
    pub receipt: Receipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub save_payment_method: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub cancellation_details: Option<CancellationDetails>,
    #[serde(default)]
    pub payment_method: Option<RemotePaymentMethod>,
    #[serde(default)]
    pub confirmation: Option<RemoteConfirmation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancellationDetails {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePaymentMethod {
    pub id: String,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfirmation {
    #[serde(default)]
    pub confirmation_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn parse_status(status: &str) -> Option<CardPaymentStatus> {
    match status {
        "pending" => Some(CardPaymentStatus::Pending),
        "waiting_for_capture" => Some(CardPaymentStatus::WaitingForCapture),
        "succeeded" => Some(CardPaymentStatus::Succeeded),
        "canceled" => Some(CardPaymentStatus::Canceled),
        _ => None,
    }
}

impl TryFrom<RemotePayment> for CardPayment {
    type Error = String;

    fn try_from(payment: RemotePayment) -> Result<Self, Self::Error> {
        let status = parse_status(&payment.status)
            .ok_or_else(|| format!("unknown payment status '{}'", payment.status))?;
        Ok(CardPayment {
            id: payment.id,
            status,
            paid: payment.paid,
            cancellation_reason: payment
                .cancellation_details
                .map(|d| CancellationReason::parse(&d.reason)),
            payment_method: payment.payment_method.map(|m| SavedPaymentMethod {
                id: m.id,
                saved: m.saved,
            }),
            confirmation_url: payment.confirmation.and_then(|c| c.confirmation_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_amounts_with_kopecks() {
        let amount = Amount::whole(199, Currency::Rub);
        assert_eq!(amount.value, "199.00");
        assert_eq!(amount.currency, "RUB");
    }

    #[test]
    fn parses_cancelled_payment_with_revoked_permission() {
        let json = r#"{
            "id": "2c5b",
            "status": "canceled",
            "paid": false,
            "cancellation_details": {"party": "yoo_money", "reason": "permission_revoked"},
            "payment_method": {"type": "bank_card", "id": "pm-1", "saved": true}
        }"#;
        let remote: RemotePayment = serde_json::from_str(json).unwrap();
        let payment = CardPayment::try_from(remote).unwrap();
        assert!(payment.is_cancelled());
        assert_eq!(
            payment.cancellation_reason,
            Some(CancellationReason::PermissionRevoked)
        );
        assert_eq!(payment.saved_method_id(), Some("pm-1"));
    }

    #[test]
    fn parses_pending_payment_with_confirmation_url() {
        let json = r#"{
            "id": "2c5b",
            "status": "pending",
            "paid": false,
            "confirmation": {"type": "redirect", "confirmation_url": "https://pay.example/2c5b"}
        }"#;
        let remote: RemotePayment = serde_json::from_str(json).unwrap();
        let payment = CardPayment::try_from(remote).unwrap();
        assert_eq!(payment.status, CardPaymentStatus::Pending);
        assert_eq!(payment.confirmation_url.as_deref(), Some("https://pay.example/2c5b"));
    }

    #[test]
    fn rejects_unknown_status() {
        let remote = RemotePayment {
            id: "x".to_string(),
            status: "refunded".to_string(),
            paid: false,
            cancellation_details: None,
            payment_method: None,
            confirmation: None,
        };
        assert!(CardPayment::try_from(remote).is_err());
    }

    #[test]
    fn saved_method_charge_omits_confirmation() {
        let body = CreatePaymentBody {
            amount: Amount::whole(100, Currency::Rub),
            capture: true,
            description: "renewal".to_string(),
            metadata: Metadata {
                purchase_id: 1,
                external_id: 42,
                months: 1,
            },
            receipt: Receipt {
                customer: ReceiptCustomer {
                    email: "receipts@example.com".to_string(),
                },
                items: vec![],
            },
            confirmation: None,
            save_payment_method: false,
            payment_method_id: Some("pm-1".to_string()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("confirmation").is_none());
        assert!(json.get("save_payment_method").is_none());
        assert_eq!(json["payment_method_id"], "pm-1");
    }
}
