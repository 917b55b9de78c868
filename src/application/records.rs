use crate::domain::callback::CallbackResult;
use crate::domain::dates::is_same_day;
use crate::domain::ports::SharedRecordStore;
use crate::domain::records::{
    ISSUES, Issue, OfficerActivity, OfficerStats, PAYMENT_CALLBACKS, PaymentCallbackRecord,
    RESERVATIONS, Reservation, USSD_LOGS, UssdLog, VIOLATIONS, Violation,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Typed access to the parking collections.
///
/// Store failures never propagate from here: reads degrade to an empty
/// collection and writes to `None`, so a flaky store still yields a
/// response on every USSD turn.
#[derive(Clone)]
pub struct ParkingRecords {
    store: SharedRecordStore,
}

impl ParkingRecords {
    pub fn new(store: SharedRecordStore) -> Self {
        Self { store }
    }

    /// Reservations dated `today`, in collection key order.
    pub async fn todays_bookings(&self, today: NaiveDate) -> Vec<(String, Reservation)> {
        self.load::<Reservation>(RESERVATIONS)
            .await
            .into_iter()
            .filter(|(_, r)| r.date.as_deref().is_some_and(|d| is_same_day(d, today)))
            .collect()
    }

    /// First reservation for `vehicle` dated `today`. Later duplicates for the
    /// same vehicle and day are ignored.
    pub async fn find_vehicle_booking(
        &self,
        vehicle: &str,
        today: NaiveDate,
    ) -> Option<(String, Reservation)> {
        self.todays_bookings(today)
            .await
            .into_iter()
            .find(|(_, r)| r.matches_vehicle(vehicle))
    }

    pub async fn record_violation(&self, violation: &Violation) -> Option<String> {
        self.append(VIOLATIONS, violation).await
    }

    pub async fn record_issue(&self, issue: &Issue) -> Option<String> {
        self.append(ISSUES, issue).await
    }

    pub async fn record_payment_callback(
        &self,
        result: &CallbackResult,
        received_at: &str,
    ) -> Option<String> {
        let metadata = result.metadata.clone().unwrap_or_default();
        let record = PaymentCallbackRecord {
            merchant_request_id: result.merchant_request_id.clone(),
            checkout_request_id: result.checkout_request_id.clone(),
            result_code: result.result_code,
            result_desc: result.result_desc.clone(),
            status: if result.is_success() { "completed" } else { "failed" }.to_string(),
            receipt_number: metadata.receipt_number,
            amount: metadata.amount,
            phone_number: metadata.phone_number,
            received_at: received_at.to_string(),
        };
        self.append(PAYMENT_CALLBACKS, &record).await
    }

    pub async fn log_interaction(&self, log: &UssdLog) {
        if self.append(USSD_LOGS, log).await.is_none() {
            tracing::warn!(session_id = %log.session_id, "USSD interaction was not logged");
        }
    }

    /// Counts of the officer's activity on `today`, plus all of today's bookings.
    pub async fn officer_stats(&self, phone: &str, today: NaiveDate) -> OfficerStats {
        let day = today.format("%Y-%m-%d").to_string();
        let filed = |records: Vec<(String, OfficerActivity)>| {
            records
                .iter()
                .filter(|(_, a)| a.filed_by_on(phone, &day))
                .count()
        };

        OfficerStats {
            checks: filed(self.load(USSD_LOGS).await),
            violations: filed(self.load(VIOLATIONS).await),
            reports: filed(self.load(ISSUES).await),
            active_bookings: self.todays_bookings(today).await.len(),
        }
    }

    async fn load<T: DeserializeOwned>(&self, collection: &str) -> Vec<(String, T)> {
        let raw = match self.store.get_collection(collection).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    collection,
                    error = %e,
                    "record store read failed, using empty data"
                );
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter_map(|(id, value)| match serde_json::from_value::<T>(value) {
                Ok(record) => Some((id, record)),
                Err(e) => {
                    tracing::debug!(collection, %id, error = %e, "skipping unreadable record");
                    None
                }
            })
            .collect()
    }

    async fn append<T: Serialize>(&self, collection: &str, record: &T) -> Option<String> {
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(collection, error = %e, "failed to encode record");
                return None;
            }
        };

        match self.store.insert(collection, value).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(collection, error = %e, "record store write failed");
                None
            }
        }
    }
}
