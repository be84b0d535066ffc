//! Services module for business logic

pub mod booking;
pub mod notification;
pub mod payment_orchestrator;

pub use booking::{BookingDetails, BookingService};
pub use notification::{
    LogMailer, Mailer, NotificationDispatcher, NotificationError, NotificationJob,
    QueueDispatcher,
};
pub use payment_orchestrator::{
    InitiatedPayment, OrchestratorConfig, PaymentOrchestrator, VerificationKind,
    VerificationOutcome,
};
