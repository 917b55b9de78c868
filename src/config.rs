//! Service configuration.
//!
//! Read from a TOML file, then selected settings are overridden from the
//! environment so credentials never need to live in the file.

use crate::application::rate_limiter::RateLimitConfig;
use crate::application::ussd::UssdSettings;
use crate::domain::payment::MerchantProfile;
use crate::error::ConfigError;
use crate::infrastructure::daraja::{DarajaSettings, SANDBOX_BASE_URL};
use crate::infrastructure::rest_store::RestStoreSettings;
use chrono::FixedOffset;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const ENV_CONSUMER_KEY: &str = "PARKME_MPESA_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "PARKME_MPESA_CONSUMER_SECRET";
pub const ENV_PASSKEY: &str = "PARKME_MPESA_PASSKEY";
pub const ENV_CALLBACK_URL: &str = "PARKME_MPESA_CALLBACK_URL";
pub const ENV_STORE_URL: &str = "PARKME_STORE_URL";
pub const ENV_STORE_SECRET: &str = "PARKME_STORE_SECRET";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: String,
    pub listen_addr: String,
    pub utc_offset_hours: i32,
    /// Take the client address from `X-Forwarded-For` for rate limiting.
    pub trust_proxy: bool,
    pub mpesa: MpesaConfig,
    pub rate_limit: RateLimitSection,
    pub store: StoreConfig,
    pub ussd: UssdSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            listen_addr: "0.0.0.0:3000".to_string(),
            utc_offset_hours: 3,
            trust_proxy: false,
            mpesa: MpesaConfig::default(),
            rate_limit: RateLimitSection::default(),
            store: StoreConfig::default(),
            ussd: UssdSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MpesaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub token_timeout_secs: u64,
    pub push_timeout_secs: u64,
    pub force_ipv4: bool,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            base_url: SANDBOX_BASE_URL.to_string(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: "174379".to_string(),
            passkey: String::new(),
            callback_url: String::new(),
            account_reference: "ParkMe".to_string(),
            transaction_desc: "Payment for Parking".to_string(),
            token_timeout_secs: 10,
            push_timeout_secs: 30,
            force_ipv4: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: Option<String>,
    pub secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            secret: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UssdSection {
    pub app_name: String,
    pub illegal_parking_penalty: u32,
}

impl Default for UssdSection {
    fn default() -> Self {
        let defaults = UssdSettings::default();
        Self {
            app_name: defaults.app_name,
            illegal_parking_penalty: defaults.illegal_parking_penalty,
        }
    }
}

impl AppConfig {
    /// Reads `path` and applies environment overrides. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Replaces settings with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CONSUMER_KEY) {
            self.mpesa.consumer_key = v;
        }
        if let Some(v) = get(ENV_CONSUMER_SECRET) {
            self.mpesa.consumer_secret = v;
        }
        if let Some(v) = get(ENV_PASSKEY) {
            self.mpesa.passkey = v;
        }
        if let Some(v) = get(ENV_CALLBACK_URL) {
            self.mpesa.callback_url = v;
        }
        if let Some(v) = get(ENV_STORE_URL) {
            self.store.base_url = Some(v);
        }
        if let Some(v) = get(ENV_STORE_SECRET) {
            self.store.secret = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("mpesa.consumer_key", &self.mpesa.consumer_key),
            ("mpesa.consumer_secret", &self.mpesa.consumer_secret),
            ("mpesa.passkey", &self.mpesa.passkey),
            ("mpesa.callback_url", &self.mpesa.callback_url),
            ("mpesa.shortcode", &self.mpesa.shortcode),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Missing(*field));
        }

        self.listen_addr()?;
        self.local_offset()?;
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.max_requests",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit.window_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| ConfigError::Invalid {
            field: "listen_addr",
            reason: format!("{e}"),
        })
    }

    /// Offset used for provider timestamps and officer-facing dates.
    pub fn local_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours.saturating_mul(3600)).ok_or_else(|| {
            ConfigError::Invalid {
                field: "utc_offset_hours",
                reason: format!("{} is out of range", self.utc_offset_hours),
            }
        })
    }

    pub fn merchant_profile(&self) -> MerchantProfile {
        MerchantProfile {
            shortcode: self.mpesa.shortcode.clone(),
            passkey: self.mpesa.passkey.clone(),
            callback_url: self.mpesa.callback_url.clone(),
            account_reference: self.mpesa.account_reference.clone(),
            transaction_desc: self.mpesa.transaction_desc.clone(),
        }
    }

    pub fn daraja_settings(&self) -> DarajaSettings {
        DarajaSettings {
            base_url: self.mpesa.base_url.clone(),
            consumer_key: self.mpesa.consumer_key.clone(),
            consumer_secret: self.mpesa.consumer_secret.clone(),
            token_timeout: Duration::from_secs(self.mpesa.token_timeout_secs),
            push_timeout: Duration::from_secs(self.mpesa.push_timeout_secs),
            force_ipv4: self.mpesa.force_ipv4,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
            ..RateLimitConfig::default()
        }
    }

    /// `None` means no remote store is configured.
    pub fn store_settings(&self) -> Option<RestStoreSettings> {
        let base_url = self.store.base_url.as_deref()?.trim();
        if base_url.is_empty() {
            return None;
        }
        Some(RestStoreSettings {
            base_url: base_url.to_string(),
            secret: self.store.secret.clone().filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(self.store.timeout_secs),
        })
    }

    pub fn ussd_settings(&self) -> UssdSettings {
        UssdSettings {
            app_name: self.ussd.app_name.clone(),
            illegal_parking_penalty: self.ussd.illegal_parking_penalty,
        }
    }

    /// Human-readable summary with every secret masked.
    pub fn redacted_summary(&self) -> String {
        let mask = |v: &str| if v.is_empty() { "<unset>" } else { "********" };
        [
            format!("environment      = {}", self.environment),
            format!("listen_addr      = {}", self.listen_addr),
            format!("utc_offset_hours = {}", self.utc_offset_hours),
            format!("trust_proxy      = {}", self.trust_proxy),
            format!("mpesa.base_url   = {}", self.mpesa.base_url),
            format!("mpesa.shortcode  = {}", self.mpesa.shortcode),
            format!("mpesa.consumer_key    = {}", mask(&self.mpesa.consumer_key)),
            format!("mpesa.consumer_secret = {}", mask(&self.mpesa.consumer_secret)),
            format!("mpesa.passkey    = {}", mask(&self.mpesa.passkey)),
            format!("mpesa.callback_url = {}", self.mpesa.callback_url),
            format!(
                "rate_limit       = {} per {}s",
                self.rate_limit.max_requests, self.rate_limit.window_secs
            ),
            format!(
                "store            = {}",
                self.store.base_url.as_deref().unwrap_or("in-memory")
            ),
            format!(
                "store.secret     = {}",
                mask(self.store.secret.as_deref().unwrap_or(""))
            ),
        ]
        .join("\n")
    }
}
