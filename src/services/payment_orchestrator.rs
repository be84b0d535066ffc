//! Payment Orchestrator Service
//!
//! Drives the initiate/verify protocol against the payment gateway and keeps
//! payment records and booking status consistent with what the gateway said.
//! Terminal payment transitions go through the store's compare-and-set, so a
//! verification can be triggered any number of times (redirect, poll,
//! webhook) and its side effects still happen once.

use crate::database::booking_repository::Booking;
use crate::database::payment_repository::{
    NewPayment, Payment, PaymentMethod, PaymentStatus, TransitionOutcome,
};
use crate::database::repository::{BookingLedger, PaymentRecordStore};
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};
use crate::payments::error::PaymentError;
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{AmountInput, CustomerContact, InitiateRequest, Money, VerifyResponse};
use crate::services::notification::{NotificationDispatcher, NotificationJob};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Configuration Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Origin the gateway redirects and calls back to, without trailing slash
    pub public_base_url: String,
    /// ISO currency code sent with every checkout
    pub currency: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://127.0.0.1:8000".to_string(),
            currency: "ETB".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn callback_url(&self, tx_ref: &str) -> String {
        format!(
            "{}/api/payments/chapa/verify/{}/",
            self.public_base_url.trim_end_matches('/'),
            tx_ref
        )
    }

    pub fn return_url(&self) -> String {
        format!(
            "{}/payment-status/",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InitiatedPayment {
    pub payment_id: Uuid,
    pub tx_ref: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    /// The payment was already COMPLETED or FAILED; nothing was done
    AlreadyTerminal,
    /// This call moved the payment to COMPLETED
    Completed,
    /// This call moved the payment to FAILED
    Failed,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub kind: VerificationKind,
    pub payment: Payment,
}

impl VerificationOutcome {
    fn from_transition(outcome: TransitionOutcome, applied_kind: VerificationKind) -> Self {
        match outcome {
            TransitionOutcome::Applied(payment) => Self {
                kind: applied_kind,
                payment,
            },
            TransitionOutcome::AlreadyTerminal(payment) => Self {
                kind: VerificationKind::AlreadyTerminal,
                payment,
            },
        }
    }

    pub fn status(&self) -> PaymentStatus {
        self.payment.status
    }

    pub fn detail(&self) -> &str {
        self.payment.status_detail.as_deref().unwrap_or("")
    }

    /// Derived from the stored row only, so repeated verifications of a
    /// settled payment read exactly like the call that settled it.
    pub fn message(&self) -> String {
        match self.payment.status {
            PaymentStatus::Completed => "Payment verified successfully.".to_string(),
            PaymentStatus::Failed => {
                let detail = self.detail();
                if detail.is_empty() {
                    "Payment verification failed.".to_string()
                } else {
                    detail.to_string()
                }
            }
            other => format!("Payment status is {}.", other),
        }
    }
}

/// Correlation key for one initiation attempt. Unique per call even for the
/// same booking.
pub fn generate_tx_ref(booking_id: &Uuid) -> String {
    format!("{}-{}", booking_id.simple(), Uuid::new_v4().simple())
}

// ============================================================================
// Main Payment Orchestrator
// ============================================================================

pub struct PaymentOrchestrator {
    bookings: Arc<dyn BookingLedger>,
    payments: Arc<dyn PaymentRecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: OrchestratorConfig,
}

impl PaymentOrchestrator {
    pub fn new(
        bookings: Arc<dyn BookingLedger>,
        payments: Arc<dyn PaymentRecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            bookings,
            payments,
            gateway,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // =========================================================================
    // Initiation
    // =========================================================================

    /// Open a hosted checkout for `booking_id` on behalf of its guest.
    ///
    /// No payment row is written until the booking, ownership and amount
    /// checks pass. From then on every outcome leaves the row either PENDING
    /// with the gateway's acknowledgement or FAILED with a reason.
    pub async fn initiate_payment(
        &self,
        booking_id: Uuid,
        amount: &AmountInput,
        user_id: Uuid,
    ) -> AppResult<InitiatedPayment> {
        let booking = self
            .bookings
            .find_booking_for_guest(booking_id, user_id)
            .await?
            .ok_or_else(|| booking_not_found(booking_id))?;

        let requested = amount.to_decimal("amount").map_err(|_| {
            AppError::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
                amount: amount.to_string(),
                reason: "amount must be a positive decimal".to_string(),
            }))
        })?;
        ensure_amount_matches(&booking, &requested)?;

        let guest = self.bookings.find_guest(user_id).await?.ok_or_else(|| {
            AppError::internal(format!("guest record missing for user {}", user_id))
        })?;

        let tx_ref = generate_tx_ref(&booking.booking_id);
        let payment = self
            .payments
            .create_pending(NewPayment {
                booking_id: booking.booking_id,
                amount: booking.total_price.clone(),
                tx_ref: tx_ref.clone(),
                status_detail: "Initiation pending".to_string(),
                payment_method: PaymentMethod::Chapa,
            })
            .await?;

        info!(
            booking_id = %booking.booking_id,
            payment_id = %payment.payment_id,
            tx_ref = %tx_ref,
            amount = %booking.total_price,
            "payment record created, contacting gateway"
        );

        let request = InitiateRequest {
            amount: Money::from_decimal(&booking.total_price, self.config.currency.clone()),
            customer: CustomerContact {
                email: guest.email,
                first_name: guest.first_name,
                last_name: guest.last_name,
            },
            tx_ref: tx_ref.clone(),
            callback_url: self.config.callback_url(&tx_ref),
            return_url: self.config.return_url(),
            title: "Travel Booking Payment".to_string(),
            description: format!("Payment for booking {}", booking.booking_id),
        };

        match self.gateway.initiate(request).await {
            Ok(response) => {
                if let Err(e) = self
                    .payments
                    .record_detail_if_open(&tx_ref, &response.message)
                    .await
                {
                    warn!(tx_ref = %tx_ref, error = %e, "failed to record gateway acknowledgement");
                }
                info!(
                    tx_ref = %tx_ref,
                    gateway = self.gateway.name(),
                    "checkout issued"
                );
                Ok(InitiatedPayment {
                    payment_id: payment.payment_id,
                    tx_ref,
                    checkout_url: response.checkout_url,
                })
            }
            Err(e) => {
                let detail = if e.is_transport() {
                    format!("API Request Error: {}", e.detail())
                } else {
                    e.detail()
                };
                warn!(
                    tx_ref = %tx_ref,
                    error = %e,
                    transport = e.is_transport(),
                    "payment initiation failed"
                );
                self.fail_if_open(&tx_ref, &detail).await;
                Err(AppError::from(e).with_context(format!("tx_ref={}", tx_ref)))
            }
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Settle a payment against the gateway. Safe to call repeatedly.
    pub async fn verify_payment(&self, tx_ref: &str) -> AppResult<VerificationOutcome> {
        let payment = self
            .payments
            .find_by_reference(tx_ref)
            .await?
            .ok_or_else(|| payment_not_found(tx_ref))?;

        if payment.status.is_terminal() {
            info!(
                tx_ref = %tx_ref,
                status = %payment.status,
                "payment already terminal, skipping gateway verification"
            );
            return Ok(VerificationOutcome {
                kind: VerificationKind::AlreadyTerminal,
                payment,
            });
        }

        match self.gateway.verify(tx_ref).await {
            Ok(response) if response.is_success() => self.complete(tx_ref, &response).await,
            Ok(response) => self.fail(tx_ref, &response.failure_detail()).await,
            Err(PaymentError::Rejected { message, .. }) => self.fail(tx_ref, &message).await,
            Err(e) => {
                warn!(tx_ref = %tx_ref, error = %e, "payment verification call failed");
                self.fail_if_open(tx_ref, &format!("API Verification Error: {}", e.detail()))
                    .await;
                Err(AppError::from(e).with_context(format!("tx_ref={}", tx_ref)))
            }
        }
    }

    async fn complete(
        &self,
        tx_ref: &str,
        response: &VerifyResponse,
    ) -> AppResult<VerificationOutcome> {
        let outcome = self
            .payments
            .transition_if_open(tx_ref, PaymentStatus::Completed, &response.success_detail())
            .await?;
        let outcome = VerificationOutcome::from_transition(outcome, VerificationKind::Completed);

        if outcome.kind != VerificationKind::Completed {
            info!(tx_ref = %tx_ref, status = %outcome.status(), "lost verification race");
            return Ok(outcome);
        }

        let payment = &outcome.payment;
        info!(
            tx_ref = %tx_ref,
            payment_id = %payment.payment_id,
            booking_id = %payment.booking_id,
            "payment completed"
        );

        match self.bookings.confirm_booking(payment.booking_id).await {
            Ok(true) => info!(booking_id = %payment.booking_id, "booking confirmed"),
            Ok(false) => info!(booking_id = %payment.booking_id, "booking was already confirmed"),
            Err(e) => error!(
                booking_id = %payment.booking_id,
                tx_ref = %tx_ref,
                error = %e,
                "failed to confirm booking for completed payment"
            ),
        }

        self.enqueue_payment_confirmation(payment).await;
        Ok(outcome)
    }

    async fn fail(&self, tx_ref: &str, detail: &str) -> AppResult<VerificationOutcome> {
        let outcome = self
            .payments
            .transition_if_open(tx_ref, PaymentStatus::Failed, detail)
            .await?;
        let outcome = VerificationOutcome::from_transition(outcome, VerificationKind::Failed);
        info!(
            tx_ref = %tx_ref,
            status = %outcome.status(),
            applied = outcome.kind == VerificationKind::Failed,
            detail = %detail,
            "payment verification failed"
        );
        Ok(outcome)
    }

    /// Best effort: the caller is already reporting an error.
    async fn fail_if_open(&self, tx_ref: &str, detail: &str) {
        match self
            .payments
            .transition_if_open(tx_ref, PaymentStatus::Failed, detail)
            .await
        {
            Ok(TransitionOutcome::Applied(_)) => {
                info!(tx_ref = %tx_ref, "payment marked failed")
            }
            Ok(TransitionOutcome::AlreadyTerminal(p)) => {
                info!(tx_ref = %tx_ref, status = %p.status, "payment already terminal, left as is")
            }
            Err(e) => error!(tx_ref = %tx_ref, error = %e, "failed to mark payment failed"),
        }
    }

    async fn enqueue_payment_confirmation(&self, payment: &Payment) {
        let guest_email = match self.guest_email_for(payment.booking_id).await {
            Some(email) => email,
            None => {
                warn!(
                    payment_id = %payment.payment_id,
                    "no guest email for payment confirmation, skipping notification"
                );
                return;
            }
        };

        let job = NotificationJob::PaymentConfirmed {
            payment_id: payment.payment_id,
            guest_email,
            amount: payment.amount.clone(),
            booking_reference: payment.booking_id,
        };
        if let Err(e) = self.dispatcher.dispatch(job) {
            warn!(
                payment_id = %payment.payment_id,
                error = %e,
                "failed to enqueue payment confirmation"
            );
        }
    }

    async fn guest_email_for(&self, booking_id: Uuid) -> Option<String> {
        let booking = match self.bookings.find_booking(booking_id).await {
            Ok(Some(booking)) => booking,
            Ok(None) => return None,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "booking lookup failed");
                return None;
            }
        };
        match self.bookings.find_guest(booking.user_id).await {
            Ok(guest) => guest.map(|g| g.email),
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "guest lookup failed");
                None
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The payment behind `tx_ref`, visible only to the booking's guest.
    pub async fn get_payment(&self, tx_ref: &str, user_id: Uuid) -> AppResult<Payment> {
        let payment = self
            .payments
            .find_by_reference(tx_ref)
            .await?
            .ok_or_else(|| payment_not_found(tx_ref))?;

        self.bookings
            .find_booking_for_guest(payment.booking_id, user_id)
            .await?
            .ok_or_else(|| payment_not_found(tx_ref))?;

        Ok(payment)
    }
}

fn ensure_amount_matches(booking: &Booking, requested: &BigDecimal) -> AppResult<()> {
    if requested != &booking.total_price {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::AmountMismatch {
                expected: booking.total_price.with_scale(2).to_string(),
                provided: requested.to_string(),
            },
        )));
    }
    Ok(())
}

fn booking_not_found(booking_id: Uuid) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::BookingNotFound {
        booking_id: booking_id.to_string(),
    }))
}

fn payment_not_found(tx_ref: &str) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::PaymentNotFound {
        tx_ref: tx_ref.to_string(),
    }))
}
