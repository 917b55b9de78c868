//! Adapters for the domain ports.

pub mod clock;
pub mod daraja;
pub mod in_memory;
pub mod rest_store;
