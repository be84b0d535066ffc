use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::BookingLedger;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Canceled => "canceled",
        }
    }

    pub fn from_db_str(status: &str) -> Option<Self> {
        match status.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "canceled" | "cancelled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }
}

/// A guest's reservation of a property for a date range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: Uuid,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fixed at creation time; payments must match it exactly
    pub total_price: BigDecimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Contact fields the gateway and the mailer need
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct GuestContact {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct PropertySummary {
    pub property_id: Uuid,
    pub name: String,
    pub location: String,
    pub price_per_night: BigDecimal,
}

/// Insert payload for a booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: BigDecimal,
}

#[derive(Debug, FromRow)]
struct BookingRow {
    booking_id: Uuid,
    property_id: Uuid,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price: BigDecimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DatabaseError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_db_str(&row.status).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::Unknown {
                message: format!("unknown booking status '{}'", row.status),
            })
        })?;

        Ok(Booking {
            booking_id: row.booking_id,
            property_id: row.property_id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "booking_id, property_id, user_id, start_date, end_date, total_price, status, created_at";

/// Repository for bookings, guests and properties
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingLedger for BookingRepository {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, DatabaseError> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Booking::try_from)
        .transpose()
    }

    async fn find_booking_for_guest(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Booking>, DatabaseError> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE booking_id = $1 AND user_id = $2",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .map(Booking::try_from)
        .transpose()
    }

    async fn find_guest(&self, user_id: Uuid) -> Result<Option<GuestContact>, DatabaseError> {
        sqlx::query_as::<_, GuestContact>(
            "SELECT user_id, email, first_name, last_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_property(
        &self,
        property_id: Uuid,
    ) -> Result<Option<PropertySummary>, DatabaseError> {
        sqlx::query_as::<_, PropertySummary>(
            "SELECT property_id, name, location, price_per_night FROM properties WHERE property_id = $1",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, DatabaseError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "INSERT INTO bookings (booking_id, property_id, user_id, start_date, end_date, total_price, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(booking.property_id)
        .bind(booking.user_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(&booking.total_price)
        .bind(BookingStatus::Pending.as_db_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Booking::try_from(row)
    }

    async fn confirm_booking(&self, booking_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $2 WHERE booking_id = $1 AND status <> $2",
        )
        .bind(booking_id)
        .bind(BookingStatus::Confirmed.as_db_str())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_guest(&self, user_id: Uuid) -> Result<Vec<Booking>, DatabaseError> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }
}
