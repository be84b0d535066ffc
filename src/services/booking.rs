//! Booking creation and lookup for the authenticated guest.

use crate::database::booking_repository::{Booking, NewBooking};
use crate::database::payment_repository::Payment;
use crate::database::repository::{BookingLedger, PaymentRecordStore};
use crate::error::{AppError, AppErrorKind, AppResult, DomainError, ValidationError};
use crate::services::notification::{NotificationDispatcher, NotificationJob};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A booking together with its payment attempts, newest first
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub payments: Vec<Payment>,
}

pub struct BookingService {
    bookings: Arc<dyn BookingLedger>,
    payments: Arc<dyn PaymentRecordStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingLedger>,
        payments: Arc<dyn PaymentRecordStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            bookings,
            payments,
            dispatcher,
        }
    }

    /// Price the stay once, store it as pending and queue the confirmation email.
    pub async fn create_booking(
        &self,
        property_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        user_id: Uuid,
    ) -> AppResult<Booking> {
        let nights = nights_between(start_date, end_date)?;

        let property = self
            .bookings
            .find_property(property_id)
            .await?
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::PropertyNotFound {
                    property_id: property_id.to_string(),
                }))
            })?;
        let guest = self.bookings.find_guest(user_id).await?.ok_or_else(|| {
            AppError::internal(format!("guest record missing for user {}", user_id))
        })?;

        let total_price = property.price_per_night.clone() * BigDecimal::from(nights);
        let booking = self
            .bookings
            .create_booking(NewBooking {
                property_id,
                user_id,
                start_date,
                end_date,
                total_price,
            })
            .await?;

        info!(
            booking_id = %booking.booking_id,
            property_id = %property_id,
            nights,
            total_price = %booking.total_price,
            "booking created"
        );

        let job = NotificationJob::BookingConfirmed {
            booking_id: booking.booking_id,
            guest_email: guest.email,
        };
        if let Err(e) = self.dispatcher.dispatch(job) {
            warn!(booking_id = %booking.booking_id, error = %e, "failed to enqueue booking confirmation");
        }

        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid, user_id: Uuid) -> AppResult<BookingDetails> {
        let booking = self
            .bookings
            .find_booking_for_guest(booking_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::new(AppErrorKind::Domain(DomainError::BookingNotFound {
                    booking_id: booking_id.to_string(),
                }))
            })?;
        let payments = self.payments.list_for_booking(booking_id).await?;
        Ok(BookingDetails { booking, payments })
    }

    pub async fn list_bookings(&self, user_id: Uuid) -> AppResult<Vec<Booking>> {
        Ok(self.bookings.list_for_guest(user_id).await?)
    }
}

fn nights_between(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<i64> {
    let nights = (end_date - start_date).num_days();
    if nights <= 0 {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::InvalidDateRange {
                start_date: start_date.to_string(),
                end_date: end_date.to_string(),
            },
        )));
    }
    Ok(nights)
}
