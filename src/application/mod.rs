//! Application services: payment initiation, callback handling and the
//! officer USSD menu.
//!
//! Everything here talks to the outside world only through the ports in
//! `domain::ports`, so each service can be driven with in-memory adapters.

pub mod callback;
pub mod payment;
pub mod rate_limiter;
pub mod records;
pub mod token_cache;
pub mod ussd;
