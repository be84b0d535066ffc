//! In-memory stores.
//!
//! Used when the service runs with `SKIP_EXTERNALS=true` and by the tests.
//! A single write lock guards every mutation, which gives the same
//! compare-and-set guarantee the Postgres `UPDATE ... WHERE` provides.

use crate::database::booking_repository::{
    Booking, BookingStatus, GuestContact, NewBooking, PropertySummary,
};
use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::payment_repository::{
    truncate_detail, NewPayment, Payment, PaymentStatus, TransitionOutcome,
};
use crate::database::repository::{BookingLedger, PaymentRecordStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    guests: HashMap<Uuid, GuestContact>,
    properties: HashMap<Uuid, PropertySummary>,
    bookings: HashMap<Uuid, Booking>,
    payments: HashMap<String, Payment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_guest(&self, guest: GuestContact) {
        self.state.write().await.guests.insert(guest.user_id, guest);
    }

    pub async fn insert_property(&self, property: PropertySummary) {
        self.state
            .write()
            .await
            .properties
            .insert(property.property_id, property);
    }

    /// Store a booking as-is, bypassing pricing.
    pub async fn insert_booking(&self, booking: Booking) {
        self.state
            .write()
            .await
            .bookings
            .insert(booking.booking_id, booking);
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }
}

#[async_trait]
impl BookingLedger for InMemoryStore {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, DatabaseError> {
        Ok(self.state.read().await.bookings.get(&booking_id).cloned())
    }

    async fn find_booking_for_guest(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Booking>, DatabaseError> {
        Ok(self
            .state
            .read()
            .await
            .bookings
            .get(&booking_id)
            .filter(|b| b.user_id == user_id)
            .cloned())
    }

    async fn find_guest(&self, user_id: Uuid) -> Result<Option<GuestContact>, DatabaseError> {
        Ok(self.state.read().await.guests.get(&user_id).cloned())
    }

    async fn find_property(
        &self,
        property_id: Uuid,
    ) -> Result<Option<PropertySummary>, DatabaseError> {
        Ok(self.state.read().await.properties.get(&property_id).cloned())
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.properties.contains_key(&booking.property_id) {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Property".to_string(),
                id: booking.property_id.to_string(),
            }));
        }

        let created = Booking {
            booking_id: Uuid::new_v4(),
            property_id: booking.property_id,
            user_id: booking.user_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        state.bookings.insert(created.booking_id, created.clone());
        Ok(created)
    }

    async fn confirm_booking(&self, booking_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        match state.bookings.get_mut(&booking_id) {
            Some(booking) if booking.status != BookingStatus::Confirmed => {
                booking.status = BookingStatus::Confirmed;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    async fn list_for_guest(&self, user_id: Uuid) -> Result<Vec<Booking>, DatabaseError> {
        let mut bookings: Vec<Booking> = self
            .state
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl PaymentRecordStore for InMemoryStore {
    async fn create_pending(&self, payment: NewPayment) -> Result<Payment, DatabaseError> {
        let mut state = self.state.write().await;
        if state.payments.contains_key(&payment.tx_ref) {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: "payments_tx_ref_key".to_string(),
            }));
        }

        let created = Payment {
            payment_id: Uuid::new_v4(),
            booking_id: payment.booking_id,
            amount: payment.amount,
            tx_ref: payment.tx_ref,
            status: PaymentStatus::Pending,
            status_detail: Some(truncate_detail(&payment.status_detail)),
            payment_method: payment.payment_method,
            payment_date: Utc::now(),
        };
        state.payments.insert(created.tx_ref.clone(), created.clone());
        Ok(created)
    }

    async fn find_by_reference(&self, tx_ref: &str) -> Result<Option<Payment>, DatabaseError> {
        Ok(self.state.read().await.payments.get(tx_ref).cloned())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<Payment>, DatabaseError> {
        let mut payments: Vec<Payment> = self
            .state
            .read()
            .await
            .payments
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    async fn record_detail_if_open(
        &self,
        tx_ref: &str,
        detail: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        let mut state = self.state.write().await;
        match state.payments.get_mut(tx_ref) {
            Some(payment) if !payment.status.is_terminal() => {
                payment.status_detail = Some(truncate_detail(detail));
                Ok(Some(payment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn transition_if_open(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        detail: &str,
    ) -> Result<TransitionOutcome, DatabaseError> {
        let mut state = self.state.write().await;
        let payment = state.payments.get_mut(tx_ref).ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::NotFound {
                entity: "Payment".to_string(),
                id: tx_ref.to_string(),
            })
        })?;

        if payment.status.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal(payment.clone()));
        }

        payment.status = status;
        payment.status_detail = Some(truncate_detail(detail));
        Ok(TransitionOutcome::Applied(payment.clone()))
    }
}
