//! Integration tests for the HTTP surface.
//!
//! The full router is driven with `oneshot`, so the request id, timeout
//! and tracing layers are part of every call.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vpn_billing::adapters::http::webhooks::{PANEL_SIGNATURE_HEADER, SUBSCRIPTION_SIGNATURE_HEADER};
use vpn_billing::adapters::http::{app_router, AppState};
use vpn_billing::adapters::memory::{
    FixedClock, InMemoryBroadcastStore, InMemoryCustomerRepository, InMemoryPromoCodeRepository,
    InMemoryPromoTariffCodeRepository, InMemoryPurchaseRepository, InMemoryVpnPanel,
    RecordingMessageSender, RecordingNotifier, ScriptedCardProvider, ScriptedCryptoProvider,
};
use vpn_billing::application::handlers::BroadcastSupervisor;
use vpn_billing::application::{BillingContext, BillingSettings, ReconcileSettings};
use vpn_billing::domain::broadcast::{Broadcast, BroadcastStatus};
use vpn_billing::domain::foundation::{BroadcastId, ExternalId, Timestamp};
use vpn_billing::domain::webhook::{sign_payload, SignatureVerifier};
use vpn_billing::ports::CustomerRepository;

const PANEL_SECRET: &str = "panel-secret";
const SUBSCRIPTION_SECRET: &str = "subscription-secret";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    customers: InMemoryCustomerRepository,
    panel: InMemoryVpnPanel,
    notifier: RecordingNotifier,
    broadcasts: InMemoryBroadcastStore,
    sender: RecordingMessageSender,
}

impl TestApp {
    fn new() -> Self {
        let mut settings = BillingSettings::default();
        settings.winback.enabled = true;

        let clock = FixedClock::new(Timestamp::parse_rfc3339("2024-06-01T12:00:00Z").unwrap());
        let customers = InMemoryCustomerRepository::new();
        let panel = InMemoryVpnPanel::new();
        let notifier = RecordingNotifier::new();
        let broadcasts = InMemoryBroadcastStore::new();
        let sender = RecordingMessageSender::new();

        let context = BillingContext {
            customers: Arc::new(customers.clone()),
            purchases: Arc::new(InMemoryPurchaseRepository::new()),
            promo_codes: Arc::new(InMemoryPromoCodeRepository::new()),
            tariff_codes: Arc::new(InMemoryPromoTariffCodeRepository::new()),
            panel: Arc::new(panel.clone()),
            card: Arc::new(ScriptedCardProvider::new()),
            crypto: Arc::new(ScriptedCryptoProvider::new()),
            notifier: Arc::new(notifier.clone()),
            clock: Arc::new(clock),
            settings: Arc::new(settings),
            reconcile: ReconcileSettings::immediate(),
        };

        let state = AppState {
            context,
            panel_verifier: SignatureVerifier::new(Some(PANEL_SECRET)),
            subscription_verifier: SignatureVerifier::new(Some(SUBSCRIPTION_SECRET)),
            broadcasts: BroadcastSupervisor::new(
                Arc::new(broadcasts.clone()),
                Arc::new(sender.clone()),
                Duration::ZERO,
            ),
        };

        Self {
            router: app_router(state, Duration::from_secs(5)),
            customers,
            panel,
            notifier,
            broadcasts,
            sender,
        }
    }

    async fn customer(&self, external_id: i64) {
        self.customers
            .find_or_create(ExternalId::new(external_id), "en")
            .await
            .unwrap();
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

fn panel_event(event: &str, telegram_id: i64) -> Vec<u8> {
    json!({
        "event": event,
        "data": {
            "uuid": "u-1",
            "telegramId": telegram_id,
            "expireAt": "2024-06-01T12:00:00Z",
            "userTraffic": { "firstConnectedAt": "2024-05-01T08:00:00Z" }
        },
        "timestamp": "2024-06-01T12:00:00Z"
    })
    .to_string()
    .into_bytes()
}

fn signed_post(uri: &str, header: &str, signature: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(header, signature)
        .body(Body::from(body))
        .unwrap()
}

fn panel_request(body: Vec<u8>) -> Request<Body> {
    let signature = sign_payload(PANEL_SECRET, &body);
    signed_post("/webhooks/panel", PANEL_SIGNATURE_HEADER, &signature, body)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_answers_ok_with_a_request_id() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

// =============================================================================
// Panel webhook
// =============================================================================

#[tokio::test]
async fn signed_expired_event_notifies_the_customer() {
    let app = TestApp::new();
    app.customer(42).await;

    let (status, body) = app.send(panel_request(panel_event("user.expired", 42))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["outcome"], "notified:subscription.expired");
    assert_eq!(app.notifier.sent_to(ExternalId::new(42)).len(), 1);
}

#[tokio::test]
async fn day_old_expiry_issues_a_winback_offer() {
    let app = TestApp::new();
    app.customer(42).await;

    let (status, body) = app
        .send(panel_request(panel_event("user.expired_24_hours_ago", 42)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "winback:issued");
    let customer = app
        .customers
        .find_by_external_id(ExternalId::new(42))
        .await
        .unwrap()
        .unwrap();
    assert!(customer.winback_offer.is_some());
}

#[tokio::test]
async fn bad_signature_is_unauthorized() {
    let app = TestApp::new();
    app.customer(42).await;

    let (status, body) = app
        .send(signed_post(
            "/webhooks/panel",
            PANEL_SIGNATURE_HEADER,
            "00ff",
            panel_event("user.expired", 42),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_SIGNATURE");
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn missing_signature_is_unauthorized() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/panel")
        .body(Body::from(panel_event("user.expired", 42)))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "MISSING_SIGNATURE");
}

#[tokio::test]
async fn unknown_customer_is_acknowledged_so_the_panel_stops_retrying() {
    let app = TestApp::new();

    let (status, body) = app.send(panel_request(panel_event("user.expired", 777))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "CUSTOMER_NOT_FOUND");
    assert_eq!(app.panel.write_count(), 0);
}

#[tokio::test]
async fn malformed_panel_payload_is_a_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.send(panel_request(b"{\"event\":".to_vec())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");
}

// =============================================================================
// Subscription webhook
// =============================================================================

fn subscription_event(name: &str, subscription_id: i64) -> Vec<u8> {
    json!({
        "name": name,
        "created_at": "2024-06-01T12:00:00Z",
        "sent_at": "2024-06-01T12:00:00Z",
        "payload": {
            "subscription_id": subscription_id,
            "subscription_name": "VPN monthly",
            "period": "monthly",
            "amount": 15000,
            "currency": "RUB",
            "telegram_user_id": 42,
            "expires_at": "2024-07-01T12:00:00Z"
        }
    })
    .to_string()
    .into_bytes()
}

fn subscription_request(body: Vec<u8>) -> Request<Body> {
    let signature = sign_payload(SUBSCRIPTION_SECRET, &body);
    signed_post(
        "/webhooks/subscription",
        SUBSCRIPTION_SIGNATURE_HEADER,
        &signature,
        body,
    )
}

#[tokio::test]
async fn redelivered_subscription_payment_extends_once() {
    let app = TestApp::new();
    app.customer(42).await;

    let (first_status, first) = app
        .send(subscription_request(subscription_event("new_subscription", 9001)))
        .await;
    let expire_after_first = app.panel.user(ExternalId::new(42)).unwrap().expire_at;
    let (second_status, second) = app
        .send(subscription_request(subscription_event("new_subscription", 9001)))
        .await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(first["outcome"], "extended");
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["outcome"], "duplicate");
    assert_eq!(
        app.panel.user(ExternalId::new(42)).unwrap().expire_at,
        expire_after_first
    );
}

// =============================================================================
// Broadcasts
// =============================================================================

fn start_request(id: i64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/broadcasts/{}/start", id))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn unknown_broadcast_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.send(start_request(99)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "BROADCAST_NOT_FOUND");
}

#[tokio::test]
async fn started_broadcast_is_accepted_and_delivered() {
    let app = TestApp::new();
    app.broadcasts.insert(Broadcast {
        id: BroadcastId::new(7),
        message: "Scheduled maintenance tonight".to_string(),
        recipients: vec![ExternalId::new(1), ExternalId::new(2)],
        status: BroadcastStatus::Pending,
    });

    let (status, body) = app.send(start_request(7)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["broadcast_id"], 7);
    assert_eq!(body["status"], "running");

    for _ in 0..50 {
        if app.broadcasts.status(BroadcastId::new(7)) == Some(BroadcastStatus::Completed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        app.broadcasts.status(BroadcastId::new(7)),
        Some(BroadcastStatus::Completed)
    );
    assert_eq!(app.sender.delivered().len(), 2);

    let (again, _) = app.send(start_request(7)).await;
    assert_eq!(again, StatusCode::CONFLICT);
}
