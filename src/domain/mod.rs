//! Domain types and the ports the application layer talks through.
//!
//! Nothing in here performs I/O. Adapters for the ports live under
//! `infrastructure`.

pub mod callback;
pub mod dates;
pub mod payment;
pub mod ports;
pub mod records;
pub mod validation;
