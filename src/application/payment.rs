use crate::application::rate_limiter::RateLimiter;
use crate::application::token_cache::AccessTokenCache;
use crate::domain::payment::{MerchantProfile, PaymentRequest, PushResult};
use crate::domain::ports::{SharedClock, SharedPaymentProvider};
use crate::domain::validation::{KesAmount, PhoneNumber};
use crate::error::{PaymentError, ProviderError, Result};
use chrono::FixedOffset;
use std::sync::Arc;

/// Drives one STK push from raw input to a classified outcome.
///
/// Validation and rate limiting run before any network call. Each failure
/// kind is returned as its own [`PaymentError`] variant and never retried
/// here, including a provider 401 on a token the cache still considers
/// fresh.
pub struct PaymentOrchestrator {
    tokens: Arc<AccessTokenCache>,
    limiter: Arc<RateLimiter>,
    provider: SharedPaymentProvider,
    clock: SharedClock,
    merchant: MerchantProfile,
    local_offset: FixedOffset,
}

impl PaymentOrchestrator {
    pub fn new(
        tokens: Arc<AccessTokenCache>,
        limiter: Arc<RateLimiter>,
        provider: SharedPaymentProvider,
        clock: SharedClock,
        merchant: MerchantProfile,
        local_offset: FixedOffset,
    ) -> Self {
        Self {
            tokens,
            limiter,
            provider,
            clock,
            merchant,
            local_offset,
        }
    }

    pub async fn initiate(
        &self,
        raw_phone: Option<&str>,
        raw_amount: Option<&str>,
        client_id: &str,
    ) -> Result<PushResult> {
        let (phone, amount) = validate(raw_phone, raw_amount)?;
        self.limiter.check(client_id)?;

        tracing::info!(client_id, phone = %phone, amount = %amount, "initiating STK push");

        let token = self.tokens.get_token().await?;
        let at = self.clock.now().with_timezone(&self.local_offset);
        let request = PaymentRequest::new(phone, amount, &self.merchant, at);
        let payload = request.to_payload(&self.merchant);
        tracing::debug!(?payload, "submitting STK push payload");

        match self.provider.push(&payload, &token).await {
            Ok(data) => {
                tracing::info!(response = %data, "STK push accepted by provider");
                Ok(PushResult { data })
            }
            Err(e) => {
                tracing::error!(error = %e, "STK push failed");
                Err(classify_provider_error(e))
            }
        }
    }
}

/// Checks both fields and reports every failing one at once.
fn validate(
    raw_phone: Option<&str>,
    raw_amount: Option<&str>,
) -> Result<(PhoneNumber, KesAmount)> {
    match (PhoneNumber::parse(raw_phone), KesAmount::parse(raw_amount)) {
        (Ok(phone), Ok(amount)) => Ok((phone, amount)),
        (phone, amount) => Err(PaymentError::ValidationError(
            [phone.err(), amount.err()].into_iter().flatten().collect(),
        )),
    }
}

pub(crate) fn classify_provider_error(error: ProviderError) -> PaymentError {
    match error {
        ProviderError::Status { status: 401, .. } => {
            PaymentError::AuthenticationError("Invalid credentials or expired token".to_string())
        }
        ProviderError::Status { status: 400, body } => {
            let message = body
                .get("errorMessage")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Invalid request parameters")
                .to_string();
            PaymentError::BadRequestError {
                message,
                details: body,
            }
        }
        ProviderError::Status { status, .. } if status >= 500 => {
            PaymentError::ServiceUnavailableError
        }
        ProviderError::Status { status, body } => {
            PaymentError::InternalError(format!("unexpected provider status {status}: {body}"))
        }
        ProviderError::Timeout => PaymentError::RequestTimeoutError,
        ProviderError::Transport(reason) | ProviderError::Decode(reason) => {
            PaymentError::InternalError(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rate_limiter::RateLimitConfig;
    use crate::domain::payment::{AccessToken, StkPushPayload};
    use crate::domain::ports::{AuthProvider, PaymentProvider};
    use crate::infrastructure::clock::ManualClock;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticAuth {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AuthProvider for StaticAuth {
        async fn fetch_token(&self) -> std::result::Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("bearer-token".to_string())
        }
    }

    struct ScriptedProvider {
        outcome: Mutex<Option<std::result::Result<serde_json::Value, ProviderError>>>,
        seen: Mutex<Vec<(StkPushPayload, String)>>,
    }

    impl ScriptedProvider {
        fn returning(outcome: std::result::Result<serde_json::Value, ProviderError>) -> Self {
            Self {
                outcome: Mutex::new(Some(outcome)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for ScriptedProvider {
        async fn push(
            &self,
            payload: &StkPushPayload,
            token: &AccessToken,
        ) -> std::result::Result<serde_json::Value, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((payload.clone(), token.value().to_string()));
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(json!({"ResponseCode": "0"})))
        }
    }

    struct Harness {
        auth: Arc<StaticAuth>,
        provider: Arc<ScriptedProvider>,
        orchestrator: PaymentOrchestrator,
    }

    fn harness(outcome: std::result::Result<serde_json::Value, ProviderError>) -> Harness {
        let auth = Arc::new(StaticAuth {
            calls: AtomicUsize::new(0),
        });
        let provider = Arc::new(ScriptedProvider::returning(outcome));
        let clock = Arc::new(ManualClock::default());
        let tokens = Arc::new(AccessTokenCache::new(auth.clone(), clock.clone()));
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
        let orchestrator = PaymentOrchestrator::new(
            tokens,
            limiter,
            provider.clone(),
            clock,
            MerchantProfile {
                shortcode: "174379".to_string(),
                passkey: "passkey".to_string(),
                callback_url: "https://example.test/cb".to_string(),
                account_reference: "ParkMe".to_string(),
                transaction_desc: "Payment for Parking".to_string(),
            },
            FixedOffset::east_opt(3 * 3600).unwrap(),
        );
        Harness {
            auth,
            provider,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_successful_push_passes_provider_body_through() {
        let body = json!({
            "MerchantRequestID": "m-1",
            "CheckoutRequestID": "c-1",
            "ResponseCode": "0",
        });
        let h = harness(Ok(body.clone()));

        let result = h
            .orchestrator
            .initiate(Some("0712345678"), Some("150"), "10.0.0.1")
            .await
            .unwrap();

        assert_eq!(result.data, body);
        let seen = h.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.phone_number, "254712345678");
        assert_eq!(seen[0].0.amount, 150);
        assert_eq!(seen[0].0.callback_url, "https://example.test/cb");
        assert_eq!(seen[0].1, "bearer-token");
    }

    #[tokio::test]
    async fn test_validation_errors_are_batched_and_short_circuit() {
        let h = harness(Ok(json!({})));

        let err = h
            .orchestrator
            .initiate(Some("12345"), Some("abc"), "10.0.0.1")
            .await
            .unwrap_err();

        match err {
            PaymentError::ValidationError(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["phone", "amount"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(h.auth.calls.load(Ordering::SeqCst), 0);
        assert!(h.provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_requests_do_not_consume_rate_limit() {
        let h = harness(Ok(json!({})));

        for _ in 0..10 {
            let _ = h.orchestrator.initiate(None, Some("10"), "client").await;
        }
        for _ in 0..5 {
            h.orchestrator
                .initiate(Some("0712345678"), Some("10"), "client")
                .await
                .unwrap();
        }
        let sixth = h
            .orchestrator
            .initiate(Some("0712345678"), Some("10"), "client")
            .await;
        assert!(matches!(sixth, Err(PaymentError::RateLimitExceeded)));
    }

    #[tokio::test]
    async fn test_provider_failures_are_classified() {
        let cases = vec![
            (
                ProviderError::Status {
                    status: 401,
                    body: json!({}),
                },
                "auth",
            ),
            (
                ProviderError::Status {
                    status: 400,
                    body: json!({"errorMessage": "Bad Request - Invalid PhoneNumber"}),
                },
                "bad_request",
            ),
            (
                ProviderError::Status {
                    status: 503,
                    body: json!({}),
                },
                "unavailable",
            ),
            (ProviderError::Timeout, "timeout"),
            (
                ProviderError::Status {
                    status: 404,
                    body: json!({}),
                },
                "internal",
            ),
            (ProviderError::Transport("connection refused".into()), "internal"),
        ];

        for (provider_error, expected) in cases {
            let h = harness(Err(provider_error));
            let err = h
                .orchestrator
                .initiate(Some("0712345678"), Some("10"), "client")
                .await
                .unwrap_err();
            let kind = match &err {
                PaymentError::AuthenticationError(_) => "auth",
                PaymentError::BadRequestError { message, .. } => {
                    assert_eq!(message, "Bad Request - Invalid PhoneNumber");
                    "bad_request"
                }
                PaymentError::ServiceUnavailableError => "unavailable",
                PaymentError::RequestTimeoutError => "timeout",
                PaymentError::InternalError(_) => "internal",
                _ => "other",
            };
            assert_eq!(kind, expected, "unexpected mapping for {err:?}");
        }
    }

    #[test]
    fn test_bad_request_without_message_uses_default() {
        let err = classify_provider_error(ProviderError::Status {
            status: 400,
            body: json!({"requestId": "r-1"}),
        });
        match err {
            PaymentError::BadRequestError { message, details } => {
                assert_eq!(message, "Invalid request parameters");
                assert_eq!(details["requestId"], "r-1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
