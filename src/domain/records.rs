//! Records kept in the shared document store.
//!
//! Reservations are written by other systems and arrive with loosely typed
//! fields, so every field read from them is optional and accepts either a
//! string or a number.

use serde::{Deserialize, Deserializer, Serialize};

pub const RESERVATIONS: &str = "reservations";
pub const VIOLATIONS: &str = "violations";
pub const ISSUES: &str = "issues";
pub const USSD_LOGS: &str = "ussd_logs";
pub const PAYMENT_CALLBACKS: &str = "payment_callbacks";

/// Placeholder upstream writers use for absent values, including a missing
/// transaction id.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reservation {
    #[serde(deserialize_with = "lenient_string")]
    pub vehicle_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub centre: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub checkin: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub checkout: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cost: Option<String>,
    #[serde(rename = "transactionID", deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

impl Reservation {
    /// Paid iff a transaction id is present, non-empty and not `N/A`.
    pub fn is_paid(&self) -> bool {
        self.transaction_id
            .as_deref()
            .map(str::trim)
            .is_some_and(|id| !id.is_empty() && id != NOT_AVAILABLE)
    }

    pub fn matches_vehicle(&self, vehicle: &str) -> bool {
        self.vehicle_number
            .as_deref()
            .is_some_and(|v| v.to_uppercase() == vehicle.to_uppercase())
    }

    pub fn location(&self) -> &str {
        self.centre.as_deref().unwrap_or(NOT_AVAILABLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub vehicle_number: String,
    pub officer_phone: String,
    pub violation_type: String,
    pub timestamp: String,
    pub location: String,
    pub penalty_amount: u32,
    pub is_paid: bool,
    pub status: String,
    pub description: String,
}

impl Violation {
    pub fn field_report(
        vehicle_number: impl Into<String>,
        officer_phone: impl Into<String>,
        violation_type: impl Into<String>,
        penalty_amount: u32,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_number: vehicle_number.into(),
            officer_phone: officer_phone.into(),
            violation_type: violation_type.into(),
            timestamp: timestamp.into(),
            location: "Field Report".to_string(),
            penalty_amount,
            is_paid: false,
            status: "pending".to_string(),
            description: "Reported via USSD by field officer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub officer_phone: String,
    pub issue_type: String,
    pub details: String,
    pub timestamp: String,
    pub status: String,
    pub priority: String,
}

impl Issue {
    pub fn open(
        officer_phone: impl Into<String>,
        issue_type: impl Into<String>,
        details: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            officer_phone: officer_phone.into(),
            issue_type: issue_type.into(),
            details: details.into(),
            timestamp: timestamp.into(),
            status: "open".to_string(),
            priority: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdLog {
    pub session_id: String,
    pub phone_number: String,
    pub input: String,
    pub response: String,
    pub timestamp: String,
}

/// Who filed a violation, issue or USSD interaction, and when.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfficerActivity {
    #[serde(deserialize_with = "lenient_string")]
    pub officer_phone: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

impl OfficerActivity {
    pub fn filed_by_on(&self, phone: &str, day_prefix: &str) -> bool {
        let filer = self.officer_phone.as_deref().or(self.phone_number.as_deref());
        filer == Some(phone)
            && self
                .timestamp
                .as_deref()
                .is_some_and(|ts| ts.starts_with(day_prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackRecord {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub received_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfficerStats {
    pub checks: usize,
    pub violations: usize,
    pub reports: usize,
    pub active_bookings: usize,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
