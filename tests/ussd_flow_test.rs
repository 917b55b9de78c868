mod common;

use async_trait::async_trait;
use common::{nairobi, test_app};
use parkme::application::records::ParkingRecords;
use parkme::application::ussd::{SessionInterpreter, UssdReply, UssdRequest, UssdSettings};
use parkme::domain::ports::{Collection, RecordStore};
use parkme::domain::records::{RESERVATIONS, USSD_LOGS, VIOLATIONS};
use parkme::error::StoreError;
use parkme::infrastructure::clock::ManualClock;
use parkme::infrastructure::in_memory::InMemoryRecordStore;
use serde_json::{Value, json};
use std::sync::Arc;

const OFFICER: &str = "+254712345678";

fn turn(text: &str) -> UssdRequest {
    UssdRequest {
        session_id: "ATUid_session".to_string(),
        service_code: "*384*55#".to_string(),
        phone_number: OFFICER.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_first_turn_shows_root_menu() {
    let app = test_app(false);
    let reply = app.state.ussd.handle(&turn("")).await;

    let UssdReply::Continue(body) = reply else {
        panic!("root menu must keep the session open");
    };
    let options: Vec<_> = body.lines().skip(1).collect();
    assert_eq!(
        options,
        vec![
            "1. Check Payment Status",
            "2. View Today's Bookings",
            "3. Report Issue",
            "4. My Stats"
        ]
    );
}

#[tokio::test]
async fn test_check_flow_without_reservation() {
    let app = test_app(false);

    let prompt = app.state.ussd.handle(&turn("1")).await;
    assert!(prompt.to_string().starts_with("CON Enter Vehicle Registration Number:"));

    let result = app.state.ussd.handle(&turn("1*KAA123A")).await;
    assert!(result.is_terminal());
    assert!(result.body().contains("Vehicle: KAA123A"));
    assert!(result.body().contains("Status: ✗ NO BOOKING FOUND"));
}

#[tokio::test]
async fn test_check_ignores_other_days() {
    let app = test_app(false);
    app.store.seed(
        RESERVATIONS,
        "r1",
        json!({"vehicleNumber": "KAA123A", "date": "2026-10-15", "transactionID": "TX1"}),
    );

    let result = app.state.ussd.handle(&turn("1*KAA123A")).await;
    assert!(result.body().contains("NO BOOKING FOUND"));
}

#[tokio::test]
async fn test_illegal_parking_report_walkthrough() {
    let app = test_app(false);

    for text in ["", "3", "3*1"] {
        let reply = app.state.ussd.handle(&turn(text)).await;
        assert!(!reply.is_terminal(), "turn {text:?} should continue");
    }
    assert!(app.store.records(VIOLATIONS).is_empty());

    let reply = app.state.ussd.handle(&turn("3*1*KBB456C")).await;
    assert!(reply.to_string().starts_with("END Violation Recorded"));

    let violations = app.store.records(VIOLATIONS);
    assert_eq!(violations.len(), 1);
    let violation = &violations[0];
    assert_eq!(violation["vehicleNumber"], "KBB456C");
    assert_eq!(violation["officerPhone"], OFFICER);
    assert_eq!(violation["violationType"], "Illegal Parking");
    assert_eq!(violation["penaltyAmount"], 2000);
    assert_eq!(violation["timestamp"], "2026-10-16 09:00:00");

    let id = app.store.ids(VIOLATIONS).remove(0);
    assert!(reply.body().contains(&format!("Violation ID: {id}")));
    assert_eq!(app.store.records(USSD_LOGS).len(), 4);
}

#[tokio::test]
async fn test_invalid_paths_end_the_session() {
    let app = test_app(false);
    for text in ["9", "1*KAA*extra", "3*7", "2*1"] {
        let reply = app.state.ussd.handle(&turn(text)).await;
        assert_eq!(reply.to_string(), "END Invalid option. Please try again.");
    }
}

#[tokio::test]
async fn test_stats_after_activity() {
    let app = test_app(false);
    app.store.seed(RESERVATIONS, "r1", json!({"vehicleNumber": "KAA1", "date": "2026-10-16"}));

    app.state.ussd.handle(&turn("3*1*KBB456C")).await;
    app.state.ussd.handle(&turn("3*3*printer jammed")).await;
    let stats = app.state.ussd.handle(&turn("4")).await;

    let body = stats.body();
    assert!(body.contains("Violations: 1"));
    assert!(body.contains("Reports: 1"));
    assert!(body.contains("Active Bookings: 1"));
    // The two earlier turns were logged before the stats lookup ran.
    assert!(body.contains("Checks: 2"));
}

/// Accepts everything except interaction logs.
struct LogRejectingStore {
    inner: InMemoryRecordStore,
}

#[async_trait]
impl RecordStore for LogRejectingStore {
    async fn get_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        self.inner.get_collection(collection).await
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        if collection == USSD_LOGS {
            return Err(StoreError::Status(503));
        }
        self.inner.insert(collection, record).await
    }
}

#[tokio::test]
async fn test_log_failure_does_not_change_reply() {
    let inner = InMemoryRecordStore::new();
    let failing = SessionInterpreter::new(
        ParkingRecords::new(Arc::new(LogRejectingStore {
            inner: inner.clone(),
        })),
        Arc::new(ManualClock::default()),
        nairobi(),
        UssdSettings::default(),
    );
    let healthy = test_app(false);

    for text in ["", "1", "2", "3", "3*2", "1*KAA1", "5"] {
        let expected = healthy.state.ussd.handle(&turn(text)).await;
        assert_eq!(failing.handle(&turn(text)).await, expected, "turn {text:?}");
    }

    assert!(failing.handle(&turn("3*1*KCC1")).await.body().starts_with("Violation Recorded"));
    assert_eq!(inner.records(VIOLATIONS).len(), 1);
    assert!(inner.records(USSD_LOGS).is_empty());
}
