//! Fixed-window request counter keyed by client identity.
//!
//! State is in memory and per process: it resets on restart and is not
//! shared between instances. Each identity's window lives in its own map
//! entry, and the entry guard makes check-and-increment atomic for
//! concurrent requests from the same client.

use crate::error::{PaymentError, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Expired windows are swept every this many checks.
    pub cleanup_interval: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(15 * 60),
            cleanup_interval: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    /// Counts a request from `client_id` and rejects it if the window is full.
    pub fn check(&self, client_id: &str) -> Result<()> {
        self.check_at(client_id, Instant::now())
    }

    pub fn check_at(&self, client_id: &str, now: Instant) -> Result<()> {
        let count = self.checks.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval.max(1) == 0 {
            self.evict_expired(now);
        }

        let mut window = self.windows.entry(client_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(window.started) >= self.config.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.config.max_requests {
            tracing::warn!(
                client_id,
                requests = window.count,
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return Err(PaymentError::RateLimitExceeded);
        }

        window.count += 1;
        Ok(())
    }

    /// Number of identities currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    fn evict_expired(&self, now: Instant) {
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
