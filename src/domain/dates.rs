use chrono::NaiveDate;

/// Formats tried in order when a reservation date is not plain ISO.
///
/// `d/m/Y` is tried before `m/d/Y`; an ambiguous string counts as today if
/// either reading lands on today.
pub const RESERVATION_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

/// Whether an upstream date string refers to `today`.
///
/// A string containing today's ISO date (for example a full RFC 3339
/// timestamp) matches immediately; otherwise each known format is tried in
/// turn and the first parse equal to `today` wins.
pub fn is_same_day(raw: &str, today: NaiveDate) -> bool {
    let raw = raw.trim();
    if raw.is_empty() {
        return false;
    }
    if raw.contains(&today.format("%Y-%m-%d").to_string()) {
        return true;
    }
    RESERVATION_DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .any(|date| date == today)
}
