//! HTTP surface: shared state, routing and the request-id plumbing.

pub mod bookings;
pub mod health;
pub mod payments;

use crate::error::AppError;
use crate::health::HealthChecker;
use crate::middleware::auth::{guest_auth_middleware, JwtAuth};
use crate::middleware::error::get_request_id_from_headers;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::payments::gateway::PaymentGateway;
use crate::services::booking::BookingService;
use crate::services::payment_orchestrator::PaymentOrchestrator;
use axum::{
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub bookings: Arc<BookingService>,
    /// Used directly only for webhook signature checks
    pub gateway: Arc<dyn PaymentGateway>,
    pub auth: Arc<JwtAuth>,
    pub health_checker: HealthChecker,
    /// Origin used for the post-verification redirects
    pub public_base_url: String,
}

pub fn router(state: AppState) -> Router {
    let guest_routes = Router::new()
        .route(
            "/api/payments/chapa/initiate/",
            post(payments::initiate_payment),
        )
        .route("/api/payments/{tx_ref}", get(payments::get_payment))
        .route(
            "/api/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/api/bookings/{booking_id}", get(bookings::get_booking))
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            guest_auth_middleware,
        ));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route(
            "/api/payments/chapa/verify/{tx_ref}/",
            get(payments::verify_payment),
        )
        .route("/api/payments/chapa/webhook", post(payments::chapa_webhook))
        .route("/payment-success/", get(payments::payment_success))
        .route("/payment-fail/", get(payments::payment_fail))
        .route("/payment-status/", get(payments::payment_status))
        .merge(guest_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Tag an error with the request id the request-id layer assigned.
pub(crate) fn with_request_id(headers: &HeaderMap) -> impl Fn(AppError) -> AppError + '_ {
    move |err| match get_request_id_from_headers(headers) {
        Some(id) => err.with_request_id(id),
        None => err,
    }
}
