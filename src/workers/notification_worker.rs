use crate::config::NotificationConfig;
use crate::database::repository::BookingLedger;
use crate::services::notification::{
    render_booking_confirmation, render_payment_confirmation, EmailMessage, Mailer,
    NotificationError, NotificationJob,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Drains the notification queue and delivers each job through a `Mailer`.
///
/// Delivery is at-least-once within one process: a failed send is retried up
/// to `max_attempts` times with a linearly growing delay, then dropped.
pub struct NotificationWorker {
    receiver: mpsc::Receiver<NotificationJob>,
    mailer: Arc<dyn Mailer>,
    ledger: Arc<dyn BookingLedger>,
    config: NotificationConfig,
}

impl NotificationWorker {
    pub fn new(
        receiver: mpsc::Receiver<NotificationJob>,
        mailer: Arc<dyn Mailer>,
        ledger: Arc<dyn BookingLedger>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            receiver,
            mailer,
            ledger,
            config,
        }
    }

    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            max_attempts = self.config.max_attempts,
            retry_delay_ms = self.config.retry_delay.as_millis() as u64,
            "notification worker started"
        );

        loop {
            tokio::select! {
                biased;

                job = self.receiver.recv() => {
                    match job {
                        Some(job) => self.process(job).await,
                        None => {
                            info!("notification queue closed");
                            break;
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        self.drain().await;
                        break;
                    }
                }
            }
        }

        info!("notification worker stopped");
    }

    /// Refuse new jobs and deliver the ones already queued.
    async fn drain(&mut self) {
        self.receiver.close();
        let mut drained = 0usize;
        while let Some(job) = self.receiver.recv().await {
            self.process(job).await;
            drained += 1;
        }
        info!(drained, "notification worker stopping, queue drained");
    }

    async fn process(&self, job: NotificationJob) {
        let kind = job.kind();
        let message = match self.render(&job).await {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                error!(kind, to = %job.recipient(), error = %e, "failed to render notification");
                return;
            }
        };

        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.mailer.send(&message).await {
                Ok(()) => {
                    info!(kind, to = %message.to, attempt, "notification delivered");
                    return;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(kind, to = %job.recipient(), attempt, error = %e, "notification delivery failed, retrying");
                    tokio::time::sleep(self.config.retry_delay * attempt).await;
                }
                Err(e) => {
                    error!(
                        kind,
                        to = %message.to,
                        attempts = max_attempts,
                        error = %e,
                        "notification dropped after retries"
                    );
                }
            }
        }
    }

    /// `Ok(None)` means the job refers to records that no longer exist.
    async fn render(&self, job: &NotificationJob) -> Result<Option<EmailMessage>, NotificationError> {
        let from = self.config.from_address.as_str();

        match job {
            NotificationJob::BookingConfirmed {
                booking_id,
                guest_email,
            } => {
                let booking = self
                    .ledger
                    .find_booking(*booking_id)
                    .await
                    .map_err(|e| NotificationError::Delivery(e.to_string()))?;
                let Some(booking) = booking else {
                    warn!(booking_id = %booking_id, "booking for notification not found");
                    return Ok(None);
                };
                let property = self
                    .ledger
                    .find_property(booking.property_id)
                    .await
                    .map_err(|e| NotificationError::Delivery(e.to_string()))?;
                let guest = self
                    .ledger
                    .find_guest(booking.user_id)
                    .await
                    .map_err(|e| NotificationError::Delivery(e.to_string()))?;

                match (property, guest) {
                    (Some(property), Some(mut guest)) => {
                        guest.email = guest_email.clone();
                        Ok(Some(render_booking_confirmation(
                            &booking, &property, &guest, from,
                        )))
                    }
                    _ => {
                        warn!(booking_id = %booking_id, "property or guest for notification not found");
                        Ok(None)
                    }
                }
            }
            NotificationJob::PaymentConfirmed {
                payment_id,
                guest_email,
                amount,
                booking_reference,
            } => Ok(Some(render_payment_confirmation(
                payment_id,
                guest_email,
                amount,
                booking_reference,
                from,
            ))),
        }
    }
}
