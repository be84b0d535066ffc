use crate::api::{with_request_id, AppState};
use crate::database::payment_repository::{Payment, PaymentStatus};
use crate::error::{AppError, AppErrorKind, AuthenticationError, ErrorCode, ValidationError};
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::error::{get_request_id_from_headers, json_error_response};
use crate::payments::error::PaymentError;
use crate::payments::types::AmountInput;
use crate::services::payment_orchestrator::{VerificationKind, VerificationOutcome};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

const SIGNATURE_HEADERS: [&str; 2] = ["chapa-signature", "x-chapa-signature"];

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentBody {
    pub booking_id: Option<Uuid>,
    pub amount: Option<AmountInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub status: String,
    pub checkout_url: String,
    pub tx_ref: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: String,
    pub message: String,
    pub payment_status: PaymentStatus,
}

/// POST /api/payments/chapa/initiate/
pub async fn initiate_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    payload: Result<Json<InitiatePaymentBody>, JsonRejection>,
) -> Response {
    let request_id = get_request_id_from_headers(&headers);
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return json_error_response(StatusCode::BAD_REQUEST, rejection.body_text(), request_id)
                .into_response();
        }
    };

    let (booking_id, amount) = match (body.booking_id, body.amount) {
        (Some(booking_id), Some(amount)) => (booking_id, amount),
        _ => {
            return with_request_id(&headers)(AppError::new(AppErrorKind::Validation(
                ValidationError::MissingField {
                    field: "booking_id, amount".to_string(),
                },
            )))
            .into_response();
        }
    };

    match state
        .orchestrator
        .initiate_payment(booking_id, &amount, user.user_id)
        .await
    {
        Ok(initiated) => Json(InitiatePaymentResponse {
            status: "success".to_string(),
            checkout_url: initiated.checkout_url,
            tx_ref: initiated.tx_ref,
        })
        .into_response(),
        Err(e) => with_request_id(&headers)(e).into_response(),
    }
}

/// GET /api/payments/chapa/verify/{tx_ref}/
///
/// Browsers arriving from the gateway get redirected to a landing page; API
/// clients sending `Accept: application/json` get the status as JSON.
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(tx_ref): Path<String>,
    headers: HeaderMap,
) -> Response {
    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    let result = state.orchestrator.verify_payment(&tx_ref).await;
    let base = state.public_base_url.as_str();

    match result {
        Ok(outcome) if wants_json => {
            Json(verification_body(&outcome)).into_response()
        }
        Ok(outcome) => redirect(&outcome_redirect(base, &tx_ref, &outcome)),
        Err(e) if wants_json || e.status_code() == 404 => {
            with_request_id(&headers)(e).into_response()
        }
        Err(e) => {
            let reason = if e.error_code() == ErrorCode::GatewayUnavailable {
                "api_error"
            } else {
                "internal_error"
            };
            warn!(tx_ref = %tx_ref, error = %e, reason, "verification failed, redirecting");
            redirect(&landing_url(
                base,
                "/payment-fail/",
                &[("tx_ref", tx_ref.as_str()), ("error", reason)],
            ))
        }
    }
}

fn verification_body(outcome: &VerificationOutcome) -> VerifyPaymentResponse {
    let status = if outcome.status() == PaymentStatus::Completed {
        "success"
    } else {
        "failed"
    };
    VerifyPaymentResponse {
        status: status.to_string(),
        message: outcome.message(),
        payment_status: outcome.status(),
    }
}

fn outcome_redirect(base: &str, tx_ref: &str, outcome: &VerificationOutcome) -> String {
    match outcome.kind {
        VerificationKind::Completed => landing_url(base, "/payment-success/", &[]),
        VerificationKind::Failed => landing_url(
            base,
            "/payment-fail/",
            &[("tx_ref", tx_ref), ("status", outcome.detail())],
        ),
        VerificationKind::AlreadyTerminal => {
            let status = outcome.status().as_db_str().to_lowercase();
            landing_url(
                base,
                "/payment-status/",
                &[("tx_ref", tx_ref), ("status", status.as_str())],
            )
        }
    }
}

fn landing_url(base: &str, path: &str, params: &[(&str, &str)]) -> String {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    if params.is_empty() {
        return raw;
    }
    match reqwest::Url::parse_with_params(&raw, params) {
        Ok(url) => url.to_string(),
        Err(e) => {
            warn!(base = %base, error = %e, "invalid public base url, redirecting without query");
            raw
        }
    }
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// POST /api/payments/chapa/webhook
///
/// Only authenticates the callback and re-drives verification; the gateway's
/// own claim about the outcome is never trusted.
pub async fn chapa_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let tag = with_request_id(&headers);
    let invalid_signature = || {
        AppError::new(AppErrorKind::Authentication(
            AuthenticationError::InvalidSignature,
        ))
    };

    let signature = SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()));
    let Some(signature) = signature else {
        warn!("webhook without signature header");
        return tag(invalid_signature()).into_response();
    };

    match state.gateway.verify_webhook(&body, signature) {
        Ok(true) => {}
        Ok(false) => {
            warn!("webhook signature mismatch");
            return tag(invalid_signature()).into_response();
        }
        Err(e @ PaymentError::WebhookVerificationError { .. }) => {
            warn!(error = %e, "webhook rejected");
            return tag(e.into()).into_response();
        }
        Err(e) => return tag(e.into()).into_response(),
    }

    let tx_ref = serde_json::from_slice::<JsonValue>(&body)
        .ok()
        .and_then(|v| v.get("tx_ref").and_then(|r| r.as_str()).map(String::from));
    let Some(tx_ref) = tx_ref else {
        return tag(AppError::new(AppErrorKind::Validation(
            ValidationError::MissingField {
                field: "tx_ref".to_string(),
            },
        )))
        .into_response();
    };

    info!(tx_ref = %tx_ref, "webhook accepted, verifying payment");
    match state.orchestrator.verify_payment(&tx_ref).await {
        Ok(outcome) => Json(verification_body(&outcome)).into_response(),
        Err(e) => tag(e).into_response(),
    }
}

/// GET /api/payments/{tx_ref}
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(tx_ref): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Payment>, AppError> {
    state
        .orchestrator
        .get_payment(&tx_ref, user.user_id)
        .await
        .map(Json)
        .map_err(with_request_id(&headers))
}

// ============================================================================
// Landing pages
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LandingQuery {
    pub tx_ref: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LandingResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn landing(message: &str, query: LandingQuery) -> Json<LandingResponse> {
    Json(LandingResponse {
        message: message.to_string(),
        tx_ref: query.tx_ref,
        status: query.status,
        error: query.error,
    })
}

pub async fn payment_success(Query(query): Query<LandingQuery>) -> Json<LandingResponse> {
    landing("Payment successful!", query)
}

pub async fn payment_fail(Query(query): Query<LandingQuery>) -> Json<LandingResponse> {
    landing("Payment failed!", query)
}

pub async fn payment_status(Query(query): Query<LandingQuery>) -> Json<LandingResponse> {
    landing("Payment status check.", query)
}
