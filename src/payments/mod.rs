//! Payment gateway integration: wire types, the gateway trait and providers

pub mod error;
pub mod gateway;
pub mod providers;
pub mod types;
pub mod utils;

pub use error::{PaymentError, PaymentResult};
pub use gateway::PaymentGateway;
pub use providers::chapa::{ChapaConfig, ChapaGateway};
pub use types::{
    AmountInput, CustomerContact, InitiateRequest, InitiateResponse, Money, VerifyData,
    VerifyResponse,
};
