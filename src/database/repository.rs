//! Storage seams used by the services.
//!
//! Both traits have a Postgres implementation and an in-memory one
//! (`database::memory`), which backs `SKIP_EXTERNALS=true` and the tests.

use crate::database::booking_repository::{Booking, GuestContact, NewBooking, PropertySummary};
use crate::database::error::DatabaseError;
use crate::database::payment_repository::{NewPayment, Payment, PaymentStatus, TransitionOutcome};
use async_trait::async_trait;
use uuid::Uuid;

/// Bookings plus the read-only guest and property records they point at.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, DatabaseError>;

    /// Like `find_booking`, but only when `user_id` is the booking's guest.
    async fn find_booking_for_guest(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Booking>, DatabaseError>;

    async fn find_guest(&self, user_id: Uuid) -> Result<Option<GuestContact>, DatabaseError>;

    async fn find_property(
        &self,
        property_id: Uuid,
    ) -> Result<Option<PropertySummary>, DatabaseError>;

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, DatabaseError>;

    /// Promote the booking to confirmed. Returns `false` when it already was.
    async fn confirm_booking(&self, booking_id: Uuid) -> Result<bool, DatabaseError>;

    /// Newest first.
    async fn list_for_guest(&self, user_id: Uuid) -> Result<Vec<Booking>, DatabaseError>;
}

/// Payment attempts keyed by transaction reference.
#[async_trait]
pub trait PaymentRecordStore: Send + Sync {
    async fn create_pending(&self, payment: NewPayment) -> Result<Payment, DatabaseError>;

    async fn find_by_reference(&self, tx_ref: &str) -> Result<Option<Payment>, DatabaseError>;

    /// Newest first.
    async fn list_for_booking(&self, booking_id: Uuid) -> Result<Vec<Payment>, DatabaseError>;

    /// Overwrite the status detail while the payment is still open.
    /// Returns `None` when the payment had already reached a terminal status.
    async fn record_detail_if_open(
        &self,
        tx_ref: &str,
        detail: &str,
    ) -> Result<Option<Payment>, DatabaseError>;

    /// Atomically move an open payment to `status`.
    ///
    /// Exactly one caller can win the move into a terminal status; everyone
    /// else gets `AlreadyTerminal` with the row as it stands.
    async fn transition_if_open(
        &self,
        tx_ref: &str,
        status: PaymentStatus,
        detail: &str,
    ) -> Result<TransitionOutcome, DatabaseError>;
}
