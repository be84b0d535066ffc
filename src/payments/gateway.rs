use crate::payments::error::PaymentResult;
use crate::payments::types::{InitiateRequest, InitiateResponse, VerifyResponse};
use async_trait::async_trait;

/// Protocol adapter for a hosted-checkout payment gateway.
///
/// `initiate` returns `Rejected` when the gateway declines and a transport
/// error (`NetworkError`/`InvalidResponse`) when the outcome is unknown.
/// `verify` returns any readable answer as `Ok`; the caller interprets it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initiate(&self, request: InitiateRequest) -> PaymentResult<InitiateResponse>;

    async fn verify(&self, tx_ref: &str) -> PaymentResult<VerifyResponse>;

    /// Check a callback body against the gateway's signature header.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> PaymentResult<bool>;
}
