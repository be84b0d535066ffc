use crate::payments::error::PaymentError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl Money {
    /// Gateways want a plain decimal string with two places.
    pub fn from_decimal(amount: &BigDecimal, currency: impl Into<String>) -> Self {
        Self {
            amount: amount.with_scale(2).to_string(),
            currency: currency.into(),
        }
    }

    pub fn validate_positive(&self, field: &str) -> Result<BigDecimal, PaymentError> {
        let parsed = parse_positive_amount(&self.amount, field)?;
        if self.currency.trim().is_empty() {
            return Err(PaymentError::ValidationError {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        Ok(parsed)
    }
}

pub fn parse_positive_amount(raw: &str, field: &str) -> Result<BigDecimal, PaymentError> {
    let parsed =
        BigDecimal::from_str(raw.trim()).map_err(|_| PaymentError::ValidationError {
            message: format!("invalid decimal amount: {}", raw),
            field: Some(field.to_string()),
        })?;
    if parsed <= BigDecimal::from(0) {
        return Err(PaymentError::ValidationError {
            message: "amount must be greater than zero".to_string(),
            field: Some(field.to_string()),
        });
    }
    Ok(parsed)
}

/// Amount as clients send it: `"800.00"` or `800.00`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn to_decimal(&self, field: &str) -> Result<BigDecimal, PaymentError> {
        match self {
            AmountInput::Text(raw) => parse_positive_amount(raw, field),
            AmountInput::Number(n) => parse_positive_amount(&n.to_string(), field),
        }
    }
}

impl std::fmt::Display for AmountInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountInput::Text(raw) => f.write_str(raw),
            AmountInput::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerContact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Everything the gateway needs to open a hosted checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitiateRequest {
    pub amount: Money,
    pub customer: CustomerContact,
    pub tx_ref: String,
    /// Where the gateway calls back; embeds `tx_ref`
    pub callback_url: String,
    pub return_url: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitiateResponse {
    pub checkout_url: String,
    /// Gateway acknowledgement text
    pub message: String,
}

/// Gateway verification answer, kept close to the wire shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<VerifyData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VerifyData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub amount: Option<JsonValue>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl VerifyResponse {
    /// Both the envelope and the transaction itself must say success.
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
            && self
                .data
                .as_ref()
                .and_then(|d| d.status.as_deref())
                .map(|s| s.eq_ignore_ascii_case("success"))
                .unwrap_or(false)
    }

    /// Detail recorded on a completed payment
    pub fn success_detail(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.status.clone())
            .unwrap_or_else(|| "Payment completed successfully.".to_string())
    }

    /// Best diagnostic available for a failed verification
    pub fn failure_detail(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.message.clone())
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Payment verification failed.".to_string())
    }
}
