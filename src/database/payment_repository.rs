use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::PaymentRecordStore;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Column width of `payments.status_detail`
pub const STATUS_DETAIL_MAX_CHARS: usize = 255;

/// Gateway-facing payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Reversed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl PaymentStatus {
    /// Completed and failed payments never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Reversed => "REVERSED",
        }
    }

    pub fn from_db_str(status: &str) -> Option<Self> {
        match status.to_uppercase().as_str() {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" | "CANCELED" => Some(PaymentStatus::Cancelled),
            "REVERSED" => Some(PaymentStatus::Reversed),
            _ => None,
        }
    }
}

/// Which rail a payment went through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Chapa,
    CreditCard,
    Paypal,
    Stripe,
}

impl PaymentMethod {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PaymentMethod::Chapa => "chapa",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Stripe => "stripe",
        }
    }

    pub fn from_db_str(method: &str) -> Option<Self> {
        match method {
            "chapa" => Some(PaymentMethod::Chapa),
            "credit_card" => Some(PaymentMethod::CreditCard),
            "paypal" => Some(PaymentMethod::Paypal),
            "stripe" => Some(PaymentMethod::Stripe),
            _ => None,
        }
    }
}

/// One payment attempt against a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    /// Correlation key shared with the gateway
    pub tx_ref: String,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub amount: BigDecimal,
    pub tx_ref: String,
    pub status_detail: String,
    pub payment_method: PaymentMethod,
}

/// Result of a compare-and-set on payment status
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// This caller moved the payment
    Applied(Payment),
    /// Someone else got there first; the row as it stands now
    AlreadyTerminal(Payment),
}

impl TransitionOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            TransitionOutcome::Applied(p) | TransitionOutcome::AlreadyTerminal(p) => p,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Clamp free text to the status detail column, on a char boundary.
pub fn truncate_detail(detail: &str) -> String {
    detail.chars().take(STATUS_DETAIL_MAX_CHARS).collect()
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    payment_id: Uuid,
    booking_id: Uuid,
    amount: BigDecimal,
    tx_ref: String,
    status: String,
    status_detail: Option<String>,
    payment_method: String,
    payment_date: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_db_str(&row.status).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::Unknown {
                message: format!("unknown payment status '{}'", row.status),
            })
        })?;
        let payment_method = PaymentMethod::from_db_str(&row.payment_method).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::Unknown {
                message: format!("unknown payment method '{}'", row.payment_method),
            })
        })?;

        Ok(Payment {
            payment_id: row.payment_id,
            booking_id: row.booking_id,
            amount: row.amount,
            tx_ref: row.tx_ref,
            status,
            status_detail: row.status_detail,
            payment_method,
            payment_date: row.payment_date,
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "payment_id, booking_id, amount, tx_ref, status, status_detail, payment_method, payment_date";

/// Repository for payment attempts
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRecordStore for PaymentRepository {
    async fn create_pending(&self, payment: NewPayment) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO payments (payment_id, booking_id, amount, tx_ref, status, status_detail, payment_method)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(payment.booking_id)
        .bind(&payment.amount)
        .bind(&payment.tx_ref)
        .bind(PaymentStatus::Pending.as_db_str())
        .bind(truncate_detail(&payment.status_detail))
        .bind(payment.payment_method.as_db_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Payment::try_from(row)
    }

    async fn find_by_reference(&self, tx_ref: &str) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE tx_ref = $1",
            PAYMENT_COLUMNS
        ))
        .bind(tx_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Payment::try_from)
        .transpose()
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<Payment>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE booking_id = $1 ORDER BY payment_date DESC",
            PAYMENT_COLUMNS
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .into_iter()
        .map(Payment::try_from)
        .collect()
    }

    async fn record_detail_if_open(
        &self,
        tx_ref: &str,
        detail: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status_detail = $2
             WHERE tx_ref = $1 AND status NOT IN ('COMPLETED', 'FAILED')
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(tx_ref)
        .bind(truncate_detail(detail))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Payment::try_from)
        .transpose()
    }

    async fn transition_if_open(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        detail: &str,
    ) -> Result<TransitionOutcome, DatabaseError> {
        // Single statement: the row lock taken by UPDATE makes concurrent
        // callers serialize, and the loser re-evaluates the WHERE clause.
        let updated = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE payments SET status = $2, status_detail = $3
             WHERE tx_ref = $1 AND status NOT IN ('COMPLETED', 'FAILED')
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(tx_ref)
        .bind(status.as_db_str())
        .bind(truncate_detail(detail))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if let Some(row) = updated {
            return Ok(TransitionOutcome::Applied(Payment::try_from(row)?));
        }

        let current = self.find_by_reference(tx_ref).await?.ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Payment".to_string(),
                id: tx_ref.to_string(),
            })
        })?;
        Ok(TransitionOutcome::AlreadyTerminal(current))
    }
}
