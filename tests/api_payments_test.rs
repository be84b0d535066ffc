//! HTTP tests for the payment and booking endpoints
//!
//! Tests cover:
//! - Authentication on guest routes
//! - Initiation status codes and body shape
//! - Verification in JSON and redirect modes
//! - Webhook signature handling
//! - Booking creation and lookup
//! - Health and request ids

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bigdecimal::BigDecimal;
use common::{fixture, Fixture, VerifyScript, BASE_URL, WEBHOOK_SECRET};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use travel_backend::api::{router, AppState};
use travel_backend::database::payment_repository::PaymentStatus;
use travel_backend::database::repository::PaymentRecordStore;
use travel_backend::health::HealthChecker;
use travel_backend::middleware::auth::JwtAuth;
use travel_backend::payments::utils::sign_hmac_sha256_hex;
use travel_backend::services::booking::BookingService;
use uuid::Uuid;

const JWT_SECRET: &str = "test-secret-at-least-16";

fn app(f: &Fixture) -> Router {
    let bookings = Arc::new(BookingService::new(
        f.store.clone(),
        f.store.clone(),
        f.dispatcher.clone(),
    ));
    router(AppState {
        orchestrator: f.orchestrator.clone(),
        bookings,
        gateway: f.gateway.clone(),
        auth: Arc::new(JwtAuth::new(JWT_SECRET)),
        health_checker: HealthChecker::new(None, None),
        public_base_url: BASE_URL.to_string(),
    })
}

fn bearer(user_id: Uuid) -> String {
    let token = JwtAuth::new(JWT_SECRET)
        .issue(user_id, chrono::Duration::hours(1))
        .unwrap();
    format!("Bearer {}", token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn initiate_request(user_id: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/chapa/initiate/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header(header::AUTHORIZATION, bearer(user_id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn verify_request(tx_ref: &str, json_mode: bool) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/api/payments/chapa/verify/{}/", tx_ref));
    if json_mode {
        builder = builder.header(header::ACCEPT, "application/json");
    }
    builder.body(Body::empty()).unwrap()
}

async fn initiate(f: &Fixture) -> String {
    let response = app(f)
        .oneshot(initiate_request(
            Some(f.guest_id),
            json!({ "booking_id": f.booking_id, "amount": "800.00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["tx_ref"]
        .as_str()
        .unwrap()
        .to_string()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

// ============================================================================
// Initiation
// ============================================================================

#[tokio::test]
async fn initiate_requires_a_token() {
    let f = fixture().await;

    let response = app(&f)
        .oneshot(initiate_request(
            None,
            json!({ "booking_id": f.booking_id, "amount": "800.00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn initiate_rejects_a_forged_token() {
    let f = fixture().await;
    let forged = JwtAuth::new("some-other-secret-value")
        .issue(f.guest_id, chrono::Duration::hours(1))
        .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/chapa/initiate/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", forged))
        .body(Body::from(
            json!({ "booking_id": f.booking_id, "amount": "800.00" }).to_string(),
        ))
        .unwrap();
    let response = app(&f).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn initiate_returns_checkout_url_and_reference() {
    let f = fixture().await;

    let response = app(&f)
        .oneshot(initiate_request(
            Some(f.guest_id),
            json!({ "booking_id": f.booking_id, "amount": "800.00" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    let tx_ref = json["tx_ref"].as_str().unwrap();
    assert!(json["checkout_url"].as_str().unwrap().ends_with(tx_ref));
}

#[tokio::test]
async fn initiate_maps_validation_and_ownership_errors() {
    let f = fixture().await;

    let mismatch = app(&f)
        .oneshot(initiate_request(
            Some(f.guest_id),
            json!({ "booking_id": f.booking_id, "amount": "799.00" }),
        ))
        .await
        .unwrap();
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(mismatch).await["error"], "AMOUNT_MISMATCH");

    let missing = app(&f)
        .oneshot(initiate_request(
            Some(f.guest_id),
            json!({ "booking_id": f.booking_id }),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let malformed = app(&f)
        .oneshot(initiate_request(
            Some(f.guest_id),
            json!({ "booking_id": "not-a-uuid", "amount": "800.00" }),
        ))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let not_owned = app(&f)
        .oneshot(initiate_request(
            Some(f.other_guest_id),
            json!({ "booking_id": f.booking_id, "amount": "800.00" }),
        ))
        .await
        .unwrap();
    assert_eq!(not_owned.status(), StatusCode::NOT_FOUND);

    assert_eq!(f.store.payment_count().await, 0);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn verify_in_json_mode_reports_status() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;

    let response = app(&f).oneshot(verify_request(&tx_ref, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["payment_status"], "COMPLETED");
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn repeated_json_verification_matches_first_answer() {
    for script in [
        VerifyScript::Success,
        VerifyScript::Failure("Card declined".to_string()),
    ] {
        let f = fixture().await;
        let tx_ref = initiate(&f).await;
        f.gateway.script_verify(script);

        let first = app(&f).oneshot(verify_request(&tx_ref, true)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;

        let second = app(&f).oneshot(verify_request(&tx_ref, true)).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second = body_json(second).await;

        assert_eq!(first, second);
        assert_eq!(f.gateway.verify_count(), 1);
    }
}

#[tokio::test]
async fn failed_verification_keeps_diagnostic_in_json() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    f.gateway
        .script_verify(VerifyScript::Failure("Card declined".to_string()));

    for _ in 0..2 {
        let response = app(&f).oneshot(verify_request(&tx_ref, true)).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "Card declined");
        assert_eq!(json["payment_status"], "FAILED");
    }
}

#[tokio::test]
async fn verify_redirects_to_success_then_status_page() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;

    let first = app(&f).oneshot(verify_request(&tx_ref, false)).await.unwrap();
    assert_eq!(first.status(), StatusCode::FOUND);
    assert_eq!(location(&first), format!("{}/payment-success/", BASE_URL));

    let second = app(&f).oneshot(verify_request(&tx_ref, false)).await.unwrap();
    assert_eq!(second.status(), StatusCode::FOUND);
    assert_eq!(
        location(&second),
        format!("{}/payment-status/?tx_ref={}&status=completed", BASE_URL, tx_ref)
    );
    assert_eq!(f.gateway.verify_count(), 1);
    assert_eq!(f.dispatcher.jobs().len(), 1);
}

#[tokio::test]
async fn verify_failure_redirect_carries_diagnostic() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    f.gateway
        .script_verify(VerifyScript::Failure("Card declined".to_string()));

    let response = app(&f).oneshot(verify_request(&tx_ref, false)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/payment-fail/?tx_ref={}&status=Card+declined", BASE_URL, tx_ref)
    );
}

#[tokio::test]
async fn verify_transport_failure_redirects_with_api_error() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    f.gateway.script_verify(VerifyScript::Transport);

    let response = app(&f).oneshot(verify_request(&tx_ref, false)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/payment-fail/?tx_ref={}&error=api_error", BASE_URL, tx_ref)
    );
}

#[tokio::test]
async fn verify_transport_failure_in_json_mode_is_500() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    f.gateway.script_verify(VerifyScript::Transport);

    let response = app(&f).oneshot(verify_request(&tx_ref, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "GATEWAY_UNAVAILABLE");
}

#[tokio::test]
async fn verify_unknown_reference_is_404_in_both_modes() {
    let f = fixture().await;

    for json_mode in [true, false] {
        let response = app(&f)
            .oneshot(verify_request("unknown-ref", json_mode))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "PAYMENT_NOT_FOUND");
    }
}

// ============================================================================
// Webhook
// ============================================================================

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/chapa/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("chapa-signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn signed_webhook_drives_verification() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    let body = json!({ "tx_ref": tx_ref, "status": "success" }).to_string();
    let signature = sign_hmac_sha256_hex(body.as_bytes(), WEBHOOK_SECRET).unwrap();

    let response = app(&f)
        .oneshot(webhook_request(&body, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["payment_status"], "COMPLETED");
    let payment = f.store.find_by_reference(&tx_ref).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn webhook_signature_is_enforced() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;
    let body = json!({ "tx_ref": tx_ref, "status": "success" }).to_string();

    let unsigned = app(&f).oneshot(webhook_request(&body, None)).await.unwrap();
    assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);

    let forged = sign_hmac_sha256_hex(body.as_bytes(), "wrong-secret").unwrap();
    let bad = app(&f)
        .oneshot(webhook_request(&body, Some(&forged)))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(f.gateway.verify_count(), 0);
    let payment = f.store.find_by_reference(&tx_ref).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_404() {
    let f = fixture().await;
    let body = json!({ "tx_ref": "unknown-ref" }).to_string();
    let signature = sign_hmac_sha256_hex(body.as_bytes(), WEBHOOK_SECRET).unwrap();

    let response = app(&f)
        .oneshot(webhook_request(&body, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Payment and booking lookup
// ============================================================================

#[tokio::test]
async fn payment_lookup_is_scoped_to_the_guest() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;

    let own = app(&f)
        .oneshot(
            Request::builder()
                .uri(format!("/api/payments/{}", tx_ref))
                .header(header::AUTHORIZATION, bearer(f.guest_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
    let json = body_json(own).await;
    assert_eq!(json["tx_ref"], tx_ref.as_str());
    assert_eq!(json["status"], "PENDING");

    let other = app(&f)
        .oneshot(
            Request::builder()
                .uri(format!("/api/payments/{}", tx_ref))
                .header(header::AUTHORIZATION, bearer(f.other_guest_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_creation_prices_the_stay() {
    let f = fixture().await;

    let response = app(&f)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, bearer(f.guest_id))
                .body(Body::from(
                    json!({
                        "property_id": f.property_id,
                        "start_date": "2026-04-10",
                        "end_date": "2026-04-13"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let total = json["total_price"].to_string();
    assert_eq!(
        BigDecimal::from_str(total.trim_matches('"')).unwrap(),
        BigDecimal::from(600)
    );
    assert_eq!(json["status"], "pending");
    assert_eq!(f.dispatcher.jobs().len(), 1);

    let list = app(&f)
        .oneshot(
            Request::builder()
                .uri("/api/bookings")
                .header(header::AUTHORIZATION, bearer(f.guest_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(body_json(list).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn booking_with_inverted_dates_is_rejected() {
    let f = fixture().await;

    let response = app(&f)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, bearer(f.guest_id))
                .body(Body::from(
                    json!({
                        "property_id": f.property_id,
                        "start_date": "2026-04-13",
                        "end_date": "2026-04-10"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "INVALID_DATE_RANGE");
}

#[tokio::test]
async fn booking_detail_lists_payment_attempts() {
    let f = fixture().await;
    let tx_ref = initiate(&f).await;

    let response = app(&f)
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/{}", f.booking_id))
                .header(header::AUTHORIZATION, bearer(f.guest_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["booking_id"], f.booking_id.to_string());
    assert_eq!(json["payments"][0]["tx_ref"], tx_ref.as_str());
}

// ============================================================================
// Landing pages, health, request ids
// ============================================================================

#[tokio::test]
async fn landing_pages_echo_query() {
    let f = fixture().await;

    let response = app(&f)
        .oneshot(
            Request::builder()
                .uri("/payment-fail/?tx_ref=abc&status=Card+declined")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Payment failed!");
    assert_eq!(json["tx_ref"], "abc");
    assert_eq!(json["status"], "Card declined");
}

#[tokio::test]
async fn health_endpoints_respond_with_request_id() {
    let f = fixture().await;

    let live = app(&f)
        .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert!(live.headers().contains_key("x-request-id"));

    let health = app(&f)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "Degraded");
}
