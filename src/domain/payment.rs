use super::validation::{KesAmount, PhoneNumber};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Provider access token together with the instant it stops being usable.
///
/// Always replaced as a whole; the value and its expiry never change
/// independently.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `true` while `now` is earlier than the expiry minus `buffer`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
        now < self.expires_at - buffer
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Fixed merchant-side settings for every push request.
#[derive(Clone)]
pub struct MerchantProfile {
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

impl fmt::Debug for MerchantProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantProfile")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .field("account_reference", &self.account_reference)
            .field("transaction_desc", &self.transaction_desc)
            .finish()
    }
}

/// One push-payment request, built fresh for each initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub phone: PhoneNumber,
    pub amount: KesAmount,
    pub shortcode: String,
    pub timestamp: String,
    pub password: String,
}

impl PaymentRequest {
    pub fn new(
        phone: PhoneNumber,
        amount: KesAmount,
        merchant: &MerchantProfile,
        at: DateTime<FixedOffset>,
    ) -> Self {
        let timestamp = at.format("%Y%m%d%H%M%S").to_string();
        let password = derive_password(&merchant.shortcode, &merchant.passkey, &timestamp);
        Self {
            phone,
            amount,
            shortcode: merchant.shortcode.clone(),
            timestamp,
            password,
        }
    }

    pub fn to_payload(&self, merchant: &MerchantProfile) -> StkPushPayload {
        StkPushPayload {
            business_short_code: self.shortcode.clone(),
            password: self.password.clone(),
            timestamp: self.timestamp.clone(),
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount: self.amount.value(),
            party_a: self.phone.as_str().to_string(),
            party_b: self.shortcode.clone(),
            phone_number: self.phone.as_str().to_string(),
            callback_url: merchant.callback_url.clone(),
            account_reference: merchant.account_reference.clone(),
            transaction_desc: merchant.transaction_desc.clone(),
        }
    }
}

/// `base64(shortcode + passkey + timestamp)`
pub fn derive_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64_STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Wire body of the provider's push endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: u32,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

impl fmt::Debug for StkPushPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StkPushPayload")
            .field("business_short_code", &self.business_short_code)
            .field("password", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("amount", &self.amount)
            .field("phone_number", &self.phone_number)
            .field("callback_url", &self.callback_url)
            .field("account_reference", &self.account_reference)
            .finish()
    }
}

/// Successful initiation: the provider's acknowledgment, passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct PushResult {
    pub data: serde_json::Value,
}
