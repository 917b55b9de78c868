#![allow(dead_code)]

use async_trait::async_trait;
use chrono::FixedOffset;
use parkme::application::callback::CallbackCorrelator;
use parkme::application::payment::PaymentOrchestrator;
use parkme::application::rate_limiter::{RateLimitConfig, RateLimiter};
use parkme::application::records::ParkingRecords;
use parkme::application::token_cache::AccessTokenCache;
use parkme::application::ussd::{SessionInterpreter, UssdSettings};
use parkme::domain::payment::{AccessToken, MerchantProfile, StkPushPayload};
use parkme::domain::ports::{AuthProvider, PaymentProvider};
use parkme::error::ProviderError;
use parkme::infrastructure::clock::ManualClock;
use parkme::infrastructure::in_memory::InMemoryRecordStore;
use parkme::interfaces::http::AppState;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PASSKEY: &str = "test-passkey";
pub const CALLBACK_URL: &str = "https://parkme.example.test/api/mpesa/callback";

#[derive(Default)]
pub struct FakeAuth {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn fetch_token(&self) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{n}"))
    }
}

/// Records every push and answers from a queue, defaulting to an accepted
/// acknowledgment.
#[derive(Default)]
pub struct FakeProvider {
    pub pushes: Mutex<Vec<StkPushPayload>>,
    pub outcomes: Mutex<Vec<Result<Value, ProviderError>>>,
}

impl FakeProvider {
    pub fn fail_next(&self, error: ProviderError) {
        self.outcomes.lock().unwrap().push(Err(error));
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn push(
        &self,
        payload: &StkPushPayload,
        _token: &AccessToken,
    ) -> Result<Value, ProviderError> {
        self.pushes.lock().unwrap().push(payload.clone());
        self.outcomes.lock().unwrap().pop().unwrap_or_else(|| {
            Ok(json!({
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResponseCode": "0",
                "ResponseDescription": "Success. Request accepted for processing",
                "CustomerMessage": "Success. Request accepted for processing"
            }))
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryRecordStore>,
    pub auth: Arc<FakeAuth>,
    pub provider: Arc<FakeProvider>,
    pub clock: Arc<ManualClock>,
}

pub fn merchant() -> MerchantProfile {
    MerchantProfile {
        shortcode: "174379".to_string(),
        passkey: PASSKEY.to_string(),
        callback_url: CALLBACK_URL.to_string(),
        account_reference: "ParkMe".to_string(),
        transaction_desc: "Payment for Parking".to_string(),
    }
}

pub fn nairobi() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap()
}

/// Fully wired state on in-memory adapters; the clock reads
/// 2026-10-16 09:00 Nairobi time.
pub fn test_app(trust_proxy: bool) -> TestApp {
    let store = Arc::new(InMemoryRecordStore::new());
    let auth = Arc::new(FakeAuth::default());
    let provider = Arc::new(FakeProvider::default());
    let clock = Arc::new(ManualClock::default());
    let records = ParkingRecords::new(store.clone());

    let payments = PaymentOrchestrator::new(
        Arc::new(AccessTokenCache::new(auth.clone(), clock.clone())),
        Arc::new(RateLimiter::new(RateLimitConfig::default())),
        provider.clone(),
        clock.clone(),
        merchant(),
        nairobi(),
    );
    let ussd = SessionInterpreter::new(
        records.clone(),
        clock.clone(),
        nairobi(),
        UssdSettings::default(),
    );

    let state = AppState {
        payments: Arc::new(payments),
        callbacks: CallbackCorrelator::new(),
        ussd: Arc::new(ussd),
        records,
        clock: clock.clone(),
        local_offset: nairobi(),
        environment: "sandbox".into(),
        trust_proxy,
    };

    TestApp {
        state,
        store,
        auth,
        provider,
        clock,
    }
}
