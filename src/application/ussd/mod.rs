//! Officer-facing USSD menu.
//!
//! There is no session storage. The gateway resends the whole answer history
//! on every turn, and the menu position is recomputed from it each time
//! (see [`state::SessionState`]).

pub mod state;

use crate::application::records::ParkingRecords;
use crate::domain::ports::SharedClock;
use crate::domain::records::{Issue, NOT_AVAILABLE, UssdLog, Violation};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use state::{IssueKind, SessionState, tokenize};
use std::fmt;

const LOGGED_RESPONSE_CHARS: usize = 100;
const MAX_LISTED_BOOKINGS: usize = 5;
const ILLEGAL_PARKING: &str = "Illegal Parking";

/// One turn as posted by the USSD gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UssdRequest {
    pub session_id: String,
    pub service_code: String,
    pub phone_number: String,
    pub text: String,
}

/// Reply text; `Continue` keeps the session open, `End` closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UssdReply {
    Continue(String),
    End(String),
}

impl UssdReply {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End(_))
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Continue(body) | Self::End(body) => body,
        }
    }
}

impl fmt::Display for UssdReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue(body) => write!(f, "CON {body}"),
            Self::End(body) => write!(f, "END {body}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UssdSettings {
    pub app_name: String,
    pub illegal_parking_penalty: u32,
}

impl Default for UssdSettings {
    fn default() -> Self {
        Self {
            app_name: "ParkMe Officer Portal".to_string(),
            illegal_parking_penalty: 2000,
        }
    }
}

pub struct SessionInterpreter {
    records: ParkingRecords,
    clock: SharedClock,
    local_offset: FixedOffset,
    settings: UssdSettings,
}

impl SessionInterpreter {
    pub fn new(
        records: ParkingRecords,
        clock: SharedClock,
        local_offset: FixedOffset,
        settings: UssdSettings,
    ) -> Self {
        Self {
            records,
            clock,
            local_offset,
            settings,
        }
    }

    /// Answers one turn and writes the interaction log.
    ///
    /// The log write is best-effort and cannot change the reply.
    pub async fn handle(&self, request: &UssdRequest) -> UssdReply {
        let tokens = tokenize(&request.text);
        let (state, reply) = self.interpret(&tokens, request).await;

        tracing::info!(
            session_id = %request.session_id,
            state = state.tag(),
            terminal = reply.is_terminal(),
            "USSD turn"
        );

        let rendered = reply.to_string();
        let log = UssdLog {
            session_id: request.session_id.clone(),
            phone_number: request.phone_number.clone(),
            input: request.text.clone(),
            response: rendered.chars().take(LOGGED_RESPONSE_CHARS).collect(),
            timestamp: self.store_timestamp(self.local_now()),
        };
        self.records.log_interaction(&log).await;

        reply
    }

    /// Resolves the menu state for `tokens` and renders its reply, performing
    /// any lookup or write the state calls for.
    pub async fn interpret(
        &self,
        tokens: &[&str],
        request: &UssdRequest,
    ) -> (SessionState, UssdReply) {
        let state = SessionState::from_tokens(tokens);
        let reply = match &state {
            SessionState::Root => UssdReply::Continue(format!(
                "Welcome to {}\n1. Check Payment Status\n2. View Today's Bookings\n\
                 3. Report Issue\n4. My Stats",
                self.settings.app_name
            )),
            SessionState::CheckPrompt => UssdReply::Continue(
                "Enter Vehicle Registration Number:\n(e.g., KAA 123A)".to_string(),
            ),
            SessionState::CheckResult { vehicle } => self.check_vehicle(vehicle).await,
            SessionState::BookingsResult => self.list_bookings().await,
            SessionState::IssueMenu => UssdReply::Continue(
                "Report Issue:\n1. Illegal Parking\n2. Payment Dispute\n3. System Error\n4. Other"
                    .to_string(),
            ),
            SessionState::IllegalPrompt => UssdReply::Continue(
                "Enter Vehicle Number for Illegal Parking Report:".to_string(),
            ),
            SessionState::IllegalResult { vehicle } => {
                self.report_violation(vehicle, &request.phone_number).await
            }
            SessionState::IssueDetailPrompt(kind) => {
                UssdReply::Continue(format!("Enter details for {}:", kind.label()))
            }
            SessionState::IssueResult { kind, details } => {
                self.report_issue(*kind, details, &request.phone_number).await
            }
            SessionState::StatsResult => self.officer_stats(&request.phone_number).await,
            SessionState::Invalid => {
                UssdReply::End("Invalid option. Please try again.".to_string())
            }
        };
        (state, reply)
    }

    async fn check_vehicle(&self, vehicle: &str) -> UssdReply {
        if vehicle.is_empty() {
            return UssdReply::End("Invalid vehicle number. Please try again.".to_string());
        }

        let Some((_, booking)) = self.records.find_vehicle_booking(vehicle, self.today()).await
        else {
            return UssdReply::End(format!(
                "Vehicle: {vehicle}\nStatus: ✗ NO BOOKING FOUND\n\n\
                 This vehicle has no active parking reservation.\n\
                 Action: Issue parking violation if parked illegally."
            ));
        };

        let or_na =
            |field: &Option<String>| field.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let paid = booking.is_paid();
        let mut body = format!(
            "Vehicle: {vehicle}\nStatus: {}\nLocation: {}\nDate: {}\n\
             Time: {} - {}\nAmount: KES {}\n",
            if paid { "✓ PAID" } else { "✗ NOT PAID" },
            booking.location(),
            or_na(&booking.date),
            or_na(&booking.checkin),
            or_na(&booking.checkout),
            booking.cost.as_deref().unwrap_or("0"),
        );
        if paid {
            body.push_str(&format!("Transaction: {}", or_na(&booking.transaction_id)));
        } else {
            body.push_str("\nAction: Request payment or issue violation");
        }
        UssdReply::End(body)
    }

    async fn list_bookings(&self) -> UssdReply {
        let bookings = self.records.todays_bookings(self.today()).await;
        if bookings.is_empty() {
            return UssdReply::End("No bookings found for today.".to_string());
        }

        let mut body = format!("Today's Bookings: {}\n\n", bookings.len());
        for (_, booking) in bookings.iter().take(MAX_LISTED_BOOKINGS) {
            body.push_str(&format!(
                "{} {} - {}\n",
                if booking.is_paid() { '✓' } else { '✗' },
                booking.vehicle_number.as_deref().unwrap_or(NOT_AVAILABLE),
                booking.location(),
            ));
        }
        if bookings.len() > MAX_LISTED_BOOKINGS {
            body.push_str(&format!("\n...and {} more", bookings.len() - MAX_LISTED_BOOKINGS));
        }
        UssdReply::End(body)
    }

    async fn report_violation(&self, vehicle: &str, officer_phone: &str) -> UssdReply {
        if vehicle.is_empty() {
            return UssdReply::End("Invalid vehicle number.".to_string());
        }

        let violation = Violation::field_report(
            vehicle,
            officer_phone,
            ILLEGAL_PARKING,
            self.settings.illegal_parking_penalty,
            self.store_timestamp(self.local_now()),
        );
        match self.records.record_violation(&violation).await {
            Some(id) => UssdReply::End(format!(
                "Violation Recorded\nVehicle: {vehicle}\nType: {ILLEGAL_PARKING}\n\
                 Violation ID: {id}\nOfficer: {officer_phone}\n\nPenalty notice will be issued."
            )),
            None => UssdReply::End("Failed to record violation. Please try again.".to_string()),
        }
    }

    async fn report_issue(&self, kind: IssueKind, details: &str, officer_phone: &str) -> UssdReply {
        let issue = Issue::open(
            officer_phone,
            kind.label(),
            details,
            self.store_timestamp(self.local_now()),
        );
        match self.records.record_issue(&issue).await {
            Some(id) => {
                let short_id: String = id.chars().take(8).collect();
                UssdReply::End(format!(
                    "Issue Reported\nType: {}\nReport ID: {short_id}\nOfficer: {officer_phone}\n\n\
                     Your report has been submitted.",
                    kind.label()
                ))
            }
            None => UssdReply::End("Failed to submit report. Please try again.".to_string()),
        }
    }

    async fn officer_stats(&self, officer_phone: &str) -> UssdReply {
        let stats = self.records.officer_stats(officer_phone, self.today()).await;
        UssdReply::End(format!(
            "Your Stats (Today)\n\nChecks: {}\nViolations: {}\nReports: {}\nActive Bookings: {}\n\n\
             Keep up the good work!",
            stats.checks, stats.violations, stats.reports, stats.active_bookings
        ))
    }

    fn local_now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.local_offset)
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    fn store_timestamp(&self, at: DateTime<FixedOffset>) -> String {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{ISSUES, RESERVATIONS, USSD_LOGS, VIOLATIONS};
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::in_memory::InMemoryRecordStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    const OFFICER: &str = "+254712345678";

    fn interpreter(store: Arc<InMemoryRecordStore>) -> SessionInterpreter {
        // 2026-10-16 09:30 in Nairobi.
        let clock = ManualClock::starting_at(Utc.with_ymd_and_hms(2026, 10, 16, 6, 30, 0).unwrap());
        SessionInterpreter::new(
            ParkingRecords::new(store),
            Arc::new(clock),
            FixedOffset::east_opt(3 * 3600).unwrap(),
            UssdSettings::default(),
        )
    }

    fn turn(text: &str) -> UssdRequest {
        UssdRequest {
            session_id: "session-1".to_string(),
            service_code: "*384*55555#".to_string(),
            phone_number: OFFICER.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_root_menu_lists_four_options() {
        let store = Arc::new(InMemoryRecordStore::new());
        let reply = interpreter(store).handle(&turn("")).await;

        let rendered = reply.to_string();
        assert!(rendered.starts_with("CON Welcome to ParkMe Officer Portal"));
        let options = rendered
            .lines()
            .filter(|l| l.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .count();
        assert_eq!(options, 4);
    }

    #[tokio::test]
    async fn test_paid_booking_shows_transaction() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.seed(RESERVATIONS, "r1", json!({
            "vehicleNumber": "KAA 123A",
            "centre": "Moi Avenue",
            "date": "2026-10-16",
            "checkin": "08:00",
            "checkout": "12:00",
            "cost": 200,
            "transactionID": "QJK2ABCD"
        }));

        let reply = interpreter(store).handle(&turn("1*kaa 123a")).await;

        assert!(reply.is_terminal());
        let body = reply.body();
        assert!(body.contains("Status: ✓ PAID"));
        assert!(body.contains("Location: Moi Avenue"));
        assert!(body.contains("Time: 08:00 - 12:00"));
        assert!(body.contains("Amount: KES 200"));
        assert!(body.ends_with("Transaction: QJK2ABCD"));
    }

    #[tokio::test]
    async fn test_unpaid_booking_suggests_action() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.seed(RESERVATIONS, "r1", json!({
            "vehicleNumber": "KCD 777X",
            "date": "16/10/2026",
            "transactionID": "N/A"
        }));

        let reply = interpreter(store).handle(&turn("1*KCD 777X")).await;

        assert!(reply.body().contains("Status: ✗ NOT PAID"));
        assert!(reply.body().contains("Action: Request payment or issue violation"));
    }

    #[tokio::test]
    async fn test_blank_vehicle_is_rejected_without_lookup() {
        let store = Arc::new(InMemoryRecordStore::new());
        let reply = interpreter(store).handle(&turn("1*  ")).await;
        assert_eq!(reply, UssdReply::End("Invalid vehicle number. Please try again.".to_string()));
    }

    #[tokio::test]
    async fn test_bookings_listing_truncates() {
        let store = Arc::new(InMemoryRecordStore::new());
        for i in 0..8 {
            store.seed(RESERVATIONS, &format!("r{i}"), json!({
                "vehicleNumber": format!("KAA{i:03}A"),
                "centre": "CBD",
                "date": "2026-10-16",
                "transactionID": if i % 2 == 0 { "TX" } else { "" }
            }));
        }
        store.seed(RESERVATIONS, "old", json!({"vehicleNumber": "KZZ", "date": "2026-10-15"}));

        let reply = interpreter(store).handle(&turn("2")).await;
        let body = reply.body();

        assert!(body.starts_with("Today's Bookings: 8\n\n"));
        assert_eq!(body.lines().filter(|l| l.contains(" - CBD")).count(), 5);
        assert!(body.contains("✓ KAA000A - CBD"));
        assert!(body.contains("✗ KAA001A - CBD"));
        assert!(body.ends_with("...and 3 more"));
    }

    #[tokio::test]
    async fn test_no_bookings_today() {
        let store = Arc::new(InMemoryRecordStore::new());
        let reply = interpreter(store).handle(&turn("2")).await;
        assert_eq!(reply.to_string(), "END No bookings found for today.");
    }

    #[tokio::test]
    async fn test_issue_report_uses_short_id_and_kind() {
        let store = Arc::new(InMemoryRecordStore::new());
        let reply = interpreter(store.clone()).handle(&turn("3*2*charged twice")).await;

        let issues = store.records(ISSUES);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0]["issueType"], "Payment Dispute");
        assert_eq!(issues[0]["details"], "charged twice");
        assert_eq!(issues[0]["timestamp"], "2026-10-16 09:30:00");

        let id = store.ids(ISSUES).remove(0);
        assert!(reply.body().contains(&format!("Report ID: {}", &id[..8])));
        assert!(reply.body().contains("Type: Payment Dispute"));
    }

    #[tokio::test]
    async fn test_failed_writes_render_failure_messages() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.set_available(false);
        let interpreter = interpreter(store);

        let violation = interpreter.handle(&turn("3*1*KBB456C")).await;
        assert_eq!(violation.to_string(), "END Failed to record violation. Please try again.");

        let issue = interpreter.handle(&turn("3*4*other thing")).await;
        assert_eq!(issue.to_string(), "END Failed to submit report. Please try again.");
    }

    #[tokio::test]
    async fn test_stats_screen() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.seed(
            VIOLATIONS,
            "v1",
            json!({"officerPhone": OFFICER, "timestamp": "2026-10-16 07:00:00"}),
        );
        let reply = interpreter(store.clone()).handle(&turn("4")).await;

        let body = reply.body();
        assert!(body.starts_with("Your Stats (Today)"));
        assert!(body.contains("Violations: 1"));
        assert!(body.contains("Checks: 0"));
        assert_eq!(store.records(USSD_LOGS).len(), 1);
    }

    #[tokio::test]
    async fn test_interaction_log_truncates_response() {
        let store = Arc::new(InMemoryRecordStore::new());
        interpreter(store.clone()).handle(&turn("")).await;

        let logs = store.records(USSD_LOGS);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["sessionId"], "session-1");
        assert_eq!(logs[0]["input"], "");
        let response = logs[0]["response"].as_str().unwrap();
        assert!(response.chars().count() <= 100);
        assert!(response.starts_with("CON Welcome"));
    }
}
