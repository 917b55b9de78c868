use crate::domain::payment::AccessToken;
use crate::domain::ports::{SharedAuthProvider, SharedClock};
use crate::error::{PaymentError, Result};
use chrono::Duration;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// How long a fetched token is assumed to live and how early it is renewed.
#[derive(Debug, Clone, Copy)]
pub struct TokenCachePolicy {
    /// Lifetime assumed for every token; the provider's own value is ignored.
    pub lifetime: Duration,
    pub refresh_buffer: Duration,
}

impl Default for TokenCachePolicy {
    fn default() -> Self {
        Self {
            lifetime: Duration::hours(1),
            refresh_buffer: Duration::minutes(5),
        }
    }
}

/// Process-wide cache for the provider access token.
///
/// Reads take the shared lock only. A stale token sends callers through the
/// refresh mutex. Each finished fetch bumps a generation counter, so a caller
/// that queued behind a fetch takes that fetch's outcome, failure included,
/// instead of issuing its own. N concurrent callers produce one provider call.
pub struct AccessTokenCache {
    provider: SharedAuthProvider,
    clock: SharedClock,
    policy: TokenCachePolicy,
    slot: RwLock<Option<AccessToken>>,
    refresh: Mutex<()>,
    generation: AtomicU64,
}

impl AccessTokenCache {
    pub fn new(provider: SharedAuthProvider, clock: SharedClock) -> Self {
        Self::with_policy(provider, clock, TokenCachePolicy::default())
    }

    pub fn with_policy(
        provider: SharedAuthProvider,
        clock: SharedClock,
        policy: TokenCachePolicy,
    ) -> Self {
        Self {
            provider,
            clock,
            policy,
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns a usable token, fetching a new one if the cached one is stale.
    ///
    /// A failed fetch leaves any previously cached token in place.
    pub async fn get_token(&self) -> Result<AccessToken> {
        let seen = self.generation.load(Ordering::Acquire);
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(token) = self.cached().await {
            return Ok(token);
        }
        if self.generation.load(Ordering::Acquire) != seen {
            // A fetch finished while we waited and left no usable token.
            return Err(authentication_failed());
        }

        let fetched = self.provider.fetch_token().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        let value = fetched.map_err(|e| {
            tracing::error!(error = %e, "failed to obtain provider access token");
            authentication_failed()
        })?;

        let token = AccessToken::new(value, self.clock.now() + self.policy.lifetime);
        tracing::debug!(expires_at = %token.expires_at(), "cached new provider access token");
        *self.slot.write().await = Some(token.clone());
        Ok(token)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    async fn cached(&self) -> Option<AccessToken> {
        let now = self.clock.now();
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh_at(now, self.policy.refresh_buffer))
            .cloned()
    }
}

fn authentication_failed() -> PaymentError {
    PaymentError::AuthenticationError("Authentication failed".to_string())
}
