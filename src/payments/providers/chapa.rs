use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{InitiateRequest, InitiateResponse, VerifyResponse};
use crate::payments::utils::{verify_hmac_sha256_hex, PaymentHttpClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{info, warn};

const GATEWAY_NAME: &str = "chapa";

#[derive(Clone)]
pub struct ChapaConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub currency: String,
}

impl std::fmt::Debug for ChapaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapaConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("currency", &self.currency)
            .field("webhook_secret_set", &self.webhook_secret.is_some())
            .finish()
    }
}

impl ChapaConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let secret_key =
            std::env::var("CHAPA_SECRET_KEY").map_err(|_| PaymentError::ValidationError {
                message: "CHAPA_SECRET_KEY environment variable is required".to_string(),
                field: Some("CHAPA_SECRET_KEY".to_string()),
            })?;

        Ok(Self {
            secret_key,
            webhook_secret: std::env::var("CHAPA_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            base_url: std::env::var("CHAPA_BASE_URL")
                .unwrap_or_else(|_| "https://api.chapa.co/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: std::env::var("CHAPA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "ETB".to_string()),
        })
    }
}

pub struct ChapaGateway {
    config: ChapaConfig,
    http: PaymentHttpClient,
}

impl ChapaGateway {
    pub fn new(config: ChapaConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn build_initialize_payload(request: &InitiateRequest) -> JsonValue {
        serde_json::json!({
            "amount": request.amount.amount,
            "currency": request.amount.currency,
            "email": request.customer.email,
            "first_name": request.customer.first_name,
            "last_name": request.customer.last_name,
            "tx_ref": request.tx_ref,
            "callback_url": request.callback_url,
            "return_url": request.return_url,
            "customization": {
                "title": request.title,
                "description": request.description,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChapaEnvelope {
    status: String,
    #[serde(default)]
    message: Option<JsonValue>,
    #[serde(default)]
    data: Option<JsonValue>,
}

/// Chapa sends `message` either as a string or as a field -> errors map.
fn message_text(message: Option<&JsonValue>) -> Option<String> {
    match message? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    fn name(&self) -> &'static str {
        GATEWAY_NAME
    }

    async fn initiate(&self, request: InitiateRequest) -> PaymentResult<InitiateResponse> {
        request.amount.validate_positive("amount")?;
        if request.tx_ref.trim().is_empty() {
            return Err(PaymentError::ValidationError {
                message: "tx_ref is required".to_string(),
                field: Some("tx_ref".to_string()),
            });
        }

        let payload = Self::build_initialize_payload(&request);

        let reply = self
            .http
            .request_json::<ChapaEnvelope>(
                reqwest::Method::POST,
                &self.endpoint("/initialize"),
                Some(&self.config.secret_key),
                Some(&payload),
            )
            .await?;
        let envelope = reply.body;
        let message = message_text(envelope.message.as_ref());

        if !envelope.status.eq_ignore_ascii_case("success") || !reply.http_status.is_success() {
            warn!(
                tx_ref = %request.tx_ref,
                http_status = reply.http_status.as_u16(),
                "chapa rejected payment initialization"
            );
            return Err(PaymentError::Rejected {
                gateway: GATEWAY_NAME.to_string(),
                message: message
                    .unwrap_or_else(|| "Failed to initiate payment with Chapa.".to_string()),
                http_status: Some(reply.http_status.as_u16()),
            });
        }

        let checkout_url = envelope
            .data
            .as_ref()
            .and_then(|v| v.get("checkout_url"))
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .ok_or(PaymentError::InvalidResponse {
                message: "chapa response did not include a checkout_url".to_string(),
            })?;

        info!(tx_ref = %request.tx_ref, "chapa checkout created");

        Ok(InitiateResponse {
            checkout_url,
            message: message.unwrap_or_else(|| {
                "Payment initiation successful, awaiting completion.".to_string()
            }),
        })
    }

    async fn verify(&self, tx_ref: &str) -> PaymentResult<VerifyResponse> {
        if tx_ref.trim().is_empty() {
            return Err(PaymentError::ValidationError {
                message: "tx_ref is required".to_string(),
                field: Some("tx_ref".to_string()),
            });
        }

        let reply = self
            .http
            .request_json::<VerifyResponse>(
                reqwest::Method::GET,
                &self.endpoint(&format!("/verify/{}", tx_ref)),
                Some(&self.config.secret_key),
                None,
            )
            .await?;

        info!(
            tx_ref = %tx_ref,
            http_status = reply.http_status.as_u16(),
            status = %reply.body.status,
            "chapa verification answered"
        );
        Ok(reply.body)
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> PaymentResult<bool> {
        let secret =
            self.config
                .webhook_secret
                .as_ref()
                .ok_or(PaymentError::WebhookVerificationError {
                    message: "CHAPA_WEBHOOK_SECRET is not configured".to_string(),
                })?;
        Ok(verify_hmac_sha256_hex(payload, secret, signature))
    }
}
