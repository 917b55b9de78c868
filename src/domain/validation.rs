use crate::error::FieldError;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const MIN_AMOUNT_KES: u32 = 1;
pub const MAX_AMOUNT_KES: u32 = 70_000;

static KENYAN_MSISDN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(254|0)?([17][0-9]{8})$").expect("static msisdn pattern compiles")
});

/// Normalizes a Kenyan mobile number to its `254XXXXXXXXX` form.
///
/// Whitespace, hyphens and plus signs are stripped before matching. Returns
/// `None` when the remaining digits are not a subscriber number starting
/// with 1 or 7.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();

    KENYAN_MSISDN
        .captures(&cleaned)
        .and_then(|caps| caps.get(2))
        .map(|subscriber| format!("254{}", subscriber.as_str()))
}

/// Parses and range-checks a payment amount, rounding to whole shillings.
pub fn validate_amount(raw: &str) -> Result<KesAmount, FieldError> {
    KesAmount::parse(Some(raw))
}

/// A validated, canonical `254XXXXXXXXX` subscriber number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: Option<&str>) -> Result<Self, FieldError> {
        let raw = match raw.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return Err(FieldError::new("phone", "Phone number is required")),
        };

        normalize_phone(raw).map(Self).ok_or_else(|| {
            FieldError::new(
                "phone",
                "Invalid phone number format. Use format: 254XXXXXXXXX or 07XXXXXXXX",
            )
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A payment amount in whole Kenyan shillings, within the provider limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct KesAmount(u32);

impl KesAmount {
    /// The range check applies to the value as given; rounding happens after.
    pub fn parse(raw: Option<&str>) -> Result<Self, FieldError> {
        let numeric = || FieldError::new("amount", "Amount must be numeric");
        // Decimal parsing tolerates `_` digit separators; plain numbers only.
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.contains('_'))
            .ok_or_else(numeric)?;

        let value = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| numeric())?;

        let out_of_range =
            || FieldError::new("amount", "Amount must be between 1 and 70,000 KES");
        if value < Decimal::from(MIN_AMOUNT_KES) || value > Decimal::from(MAX_AMOUNT_KES) {
            return Err(out_of_range());
        }

        value
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .map(Self)
            .ok_or_else(out_of_range)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for KesAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
