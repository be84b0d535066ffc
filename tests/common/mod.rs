//! Shared fixtures: in-memory stores seeded with one guest, one property and
//! one 800.00 booking, a scripted gateway and a recording dispatcher.

#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use travel_backend::database::booking_repository::{
    Booking, BookingStatus, GuestContact, PropertySummary,
};
use travel_backend::database::memory::InMemoryStore;
use travel_backend::database::payment_repository::PaymentStatus;
use travel_backend::database::repository::PaymentRecordStore;
use travel_backend::payments::error::{PaymentError, PaymentResult};
use travel_backend::payments::gateway::PaymentGateway;
use travel_backend::payments::types::{
    InitiateRequest, InitiateResponse, VerifyData, VerifyResponse,
};
use travel_backend::payments::utils::verify_hmac_sha256_hex;
use travel_backend::services::notification::{
    NotificationDispatcher, NotificationError, NotificationJob,
};
use travel_backend::services::payment_orchestrator::{OrchestratorConfig, PaymentOrchestrator};

pub const BASE_URL: &str = "http://localhost:8000";
pub const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Debug, Clone)]
pub enum InitiateScript {
    Checkout,
    Reject(String),
    Transport,
}

#[derive(Debug, Clone)]
pub enum VerifyScript {
    Success,
    Failure(String),
    Rejected(String),
    Transport,
}

pub struct ScriptedGateway {
    initiate: Mutex<InitiateScript>,
    verify: Mutex<VerifyScript>,
    verify_delay: Mutex<Duration>,
    pub initiate_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub last_initiate: Mutex<Option<InitiateRequest>>,
    settled_during_initiate: Mutex<Option<Arc<InMemoryStore>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            initiate: Mutex::new(InitiateScript::Checkout),
            verify: Mutex::new(VerifyScript::Success),
            verify_delay: Mutex::new(Duration::ZERO),
            initiate_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            last_initiate: Mutex::new(None),
            settled_during_initiate: Mutex::new(None),
        }
    }

    pub fn script_initiate(&self, script: InitiateScript) {
        *self.initiate.lock().unwrap() = script;
    }

    pub fn script_verify(&self, script: VerifyScript) {
        *self.verify.lock().unwrap() = script;
    }

    pub fn delay_verify(&self, delay: Duration) {
        *self.verify_delay.lock().unwrap() = delay;
    }

    /// Completes the payment in `store` while the initiate call is still in
    /// flight, as a verification racing the checkout request would.
    pub fn settle_during_initiate(&self, store: Arc<InMemoryStore>) {
        *self.settled_during_initiate.lock().unwrap() = Some(store);
    }

    pub fn initiate_count(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn initiate(&self, request: InitiateRequest) -> PaymentResult<InitiateResponse> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.initiate.lock().unwrap().clone();
        let tx_ref = request.tx_ref.clone();
        *self.last_initiate.lock().unwrap() = Some(request);

        let settle = self.settled_during_initiate.lock().unwrap().clone();
        if let Some(store) = settle {
            store
                .transition_if_open(&tx_ref, PaymentStatus::Completed, "success")
                .await
                .unwrap();
        }

        match script {
            InitiateScript::Checkout => Ok(InitiateResponse {
                checkout_url: format!("https://checkout.chapa.co/checkout/payment/{}", tx_ref),
                message: "Hosted Link".to_string(),
            }),
            InitiateScript::Reject(message) => Err(PaymentError::Rejected {
                gateway: "chapa".to_string(),
                message,
                http_status: Some(400),
            }),
            InitiateScript::Transport => Err(PaymentError::NetworkError {
                message: "connection refused".to_string(),
            }),
        }
    }

    async fn verify(&self, _tx_ref: &str) -> PaymentResult<VerifyResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.verify_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let script = self.verify.lock().unwrap().clone();

        match script {
            VerifyScript::Success => Ok(VerifyResponse {
                status: "success".to_string(),
                message: Some("Payment details".to_string()),
                data: Some(VerifyData {
                    status: Some("success".to_string()),
                    ..Default::default()
                }),
            }),
            VerifyScript::Failure(message) => Ok(VerifyResponse {
                status: "success".to_string(),
                message: Some("Payment details".to_string()),
                data: Some(VerifyData {
                    status: Some("failed".to_string()),
                    message: Some(message),
                    ..Default::default()
                }),
            }),
            VerifyScript::Rejected(message) => Err(PaymentError::Rejected {
                gateway: "chapa".to_string(),
                message,
                http_status: Some(404),
            }),
            VerifyScript::Transport => Err(PaymentError::NetworkError {
                message: "operation timed out".to_string(),
            }),
        }
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> PaymentResult<bool> {
        Ok(verify_hmac_sha256_hex(payload, WEBHOOK_SECRET, signature))
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<NotificationJob>>,
    failing: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every job as if the queue were full.
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn dispatch(&self, job: NotificationJob) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::QueueFull);
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub guest_id: Uuid,
    pub other_guest_id: Uuid,
    pub property_id: Uuid,
    pub booking_id: Uuid,
}

pub async fn fixture() -> Fixture {
    fixture_with(RecordingDispatcher::new()).await
}

pub async fn fixture_with(dispatcher: RecordingDispatcher) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let guest_id = Uuid::new_v4();
    let other_guest_id = Uuid::new_v4();
    let property_id = Uuid::new_v4();
    let booking_id = Uuid::new_v4();

    store
        .insert_guest(GuestContact {
            user_id: guest_id,
            email: "guest@example.com".to_string(),
            first_name: "Abebe".to_string(),
            last_name: "Kebede".to_string(),
        })
        .await;
    store
        .insert_guest(GuestContact {
            user_id: other_guest_id,
            email: "other@example.com".to_string(),
            first_name: "Sara".to_string(),
            last_name: "Tesfaye".to_string(),
        })
        .await;
    store
        .insert_property(PropertySummary {
            property_id,
            name: "Lakeside Lodge".to_string(),
            location: "Bahir Dar".to_string(),
            price_per_night: BigDecimal::from_str("200.00").unwrap(),
        })
        .await;
    store
        .insert_booking(Booking {
            booking_id,
            property_id,
            user_id: guest_id,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            total_price: BigDecimal::from_str("800.00").unwrap(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        })
        .await;

    let gateway = Arc::new(ScriptedGateway::new());
    let dispatcher = Arc::new(dispatcher);
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        store.clone(),
        gateway.clone(),
        dispatcher.clone(),
        OrchestratorConfig {
            public_base_url: BASE_URL.to_string(),
            currency: "ETB".to_string(),
        },
    ));

    Fixture {
        store,
        gateway,
        dispatcher,
        orchestrator,
        guest_id,
        other_guest_id,
        property_id,
        booking_id,
    }
}
