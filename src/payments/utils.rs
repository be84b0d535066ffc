use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// Thin JSON-over-HTTP client for gateway calls.
///
/// One attempt per call; a stuck payment is re-driven by a later verification,
/// not by retrying here.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

/// A decoded gateway reply together with its HTTP status
#[derive(Debug)]
pub struct GatewayReply<T> {
    pub http_status: StatusCode,
    pub body: T,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self { client, timeout })
    }

    /// Send a request and decode the body as `T`.
    ///
    /// Error statuses are still decoded: gateways report rejections as JSON on
    /// 4xx. Only a body that does not decode becomes an error here.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
    ) -> PaymentResult<GatewayReply<T>> {
        let mut request = self.client.request(method, url).timeout(self.timeout);

        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: format!("gateway request failed: {}", e),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: format!("failed to read gateway response: {}", e),
            })?;
        debug!(status = %status, url = %url, "gateway responded");

        match serde_json::from_str::<T>(&text) {
            Ok(body) => Ok(GatewayReply {
                http_status: status,
                body,
            }),
            Err(e) if status.is_success() => Err(PaymentError::InvalidResponse {
                message: format!("invalid gateway JSON response: {}", e),
            }),
            Err(_) => Err(PaymentError::NetworkError {
                message: format!("HTTP {}: {}", status, truncate(&text, 200)),
            }),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub fn verify_hmac_sha256_hex(payload: &[u8], secret: &str, signature: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());
    secure_eq(
        computed.as_bytes(),
        signature.trim().to_lowercase().as_bytes(),
    )
}

pub fn sign_hmac_sha256_hex(payload: &[u8], secret: &str) -> Option<String> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_eq_behaves_correctly() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abd"));
        assert!(!secure_eq(b"abc", b"ab"));
    }

    #[test]
    fn webhook_hmac_round_trip() {
        let payload = br#"{"tx_ref":"abc","status":"success"}"#;
        let signature = sign_hmac_sha256_hex(payload, "whsec").unwrap();

        assert!(verify_hmac_sha256_hex(payload, "whsec", &signature));
        assert!(verify_hmac_sha256_hex(
            payload,
            "whsec",
            &signature.to_uppercase()
        ));
        assert!(!verify_hmac_sha256_hex(payload, "other", &signature));
        assert!(!verify_hmac_sha256_hex(payload, "whsec", "not-a-valid-signature"));
    }
}
