//! Guest notifications.
//!
//! Services hand a `NotificationJob` to a `NotificationDispatcher` and move on.
//! The in-process implementation is a bounded queue drained by
//! `workers::notification_worker`, which renders jobs into emails and hands
//! them to a `Mailer`.

use crate::database::booking_repository::{Booking, GuestContact, PropertySummary};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationJob {
    BookingConfirmed {
        booking_id: Uuid,
        guest_email: String,
    },
    PaymentConfirmed {
        payment_id: Uuid,
        guest_email: String,
        amount: BigDecimal,
        booking_reference: Uuid,
    },
}

impl NotificationJob {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationJob::BookingConfirmed { .. } => "booking_confirmed",
            NotificationJob::PaymentConfirmed { .. } => "payment_confirmed",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            NotificationJob::BookingConfirmed { guest_email, .. }
            | NotificationJob::PaymentConfirmed { guest_email, .. } => guest_email,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification queue is closed")]
    QueueClosed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Fire-and-forget job submission. Never waits for the job to run.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, job: NotificationJob) -> Result<(), NotificationError>;
}

/// Dispatcher backed by a bounded in-process channel
#[derive(Clone)]
pub struct QueueDispatcher {
    sender: mpsc::Sender<NotificationJob>,
}

impl QueueDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Free slots left in the queue
    pub fn available_slots(&self) -> usize {
        self.sender.capacity()
    }

    pub fn max_slots(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl NotificationDispatcher for QueueDispatcher {
    fn dispatch(&self, job: NotificationJob) -> Result<(), NotificationError> {
        let kind = job.kind();
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotificationError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => NotificationError::QueueClosed,
        })?;
        info!(kind, "notification job queued");
        Ok(())
    }
}

// ============================================================================
// Email rendering
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

pub fn render_booking_confirmation(
    booking: &Booking,
    property: &PropertySummary,
    guest: &GuestContact,
    from: &str,
) -> EmailMessage {
    let subject = format!(
        "Your Booking #{} is Confirmed with ALX Travel.",
        short_id(&booking.booking_id)
    );
    let body = format!(
        "Dear {first_name},\n\n\
         Thank you for booking with ALX Travel!\n\n\
         Your booking for '{property}' located in {location} from {start} to {end} \
         has been successfully confirmed.\n\n\
         Price per night: {ppn} USD\n\
         Total price: {total} USD\n\n\
         We look forward to hosting you!\n\n\
         Best regards,\n\
         ALX Travel Team",
        first_name = guest.first_name,
        property = property.name,
        location = property.location,
        start = booking.start_date,
        end = booking.end_date,
        ppn = property.price_per_night.with_scale(2),
        total = booking.total_price.with_scale(2),
    );

    EmailMessage {
        to: guest.email.clone(),
        from: from.to_string(),
        subject,
        body,
    }
}

pub fn render_payment_confirmation(
    payment_id: &Uuid,
    guest_email: &str,
    amount: &BigDecimal,
    booking_reference: &Uuid,
    from: &str,
) -> EmailMessage {
    let subject = format!(
        "Your Payment for Booking {} is Confirmed!",
        booking_reference
    );
    let body = format!(
        "Dear customer,\n\n\
         Your payment of {amount} ETB for booking {booking} has been successfully processed. \
         Payment ID: {payment}...\n\n\
         Thank you for choosing ALX Travel!\n\n\
         Best regards,\n\
         The ALX Travel Team",
        amount = amount.with_scale(2),
        booking = booking_reference,
        payment = short_id(payment_id),
    );

    EmailMessage {
        to: guest_email.to_string(),
        from: from.to_string(),
        subject,
        body,
    }
}

// ============================================================================
// Delivery
// ============================================================================

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Writes each email to the log instead of sending it
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        if message.to.trim().is_empty() {
            warn!(subject = %message.subject, "🔔 email has no recipient");
            return Err(NotificationError::Delivery(
                "recipient address is empty".to_string(),
            ));
        }
        info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            "🔔 EMAIL: {}", message.body
        );
        Ok(())
    }
}
