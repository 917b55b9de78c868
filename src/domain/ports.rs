use super::payment::{AccessToken, StkPushPayload};
use crate::error::{ProviderError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Raw contents of a record-store collection, keyed by generated id.
///
/// Keys are ordered, so generated ids that sort chronologically yield
/// records in insertion order.
pub type Collection = BTreeMap<String, serde_json::Value>;

/// Flat get-all / append access to a remote JSON document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_collection(&self, collection: &str) -> Result<Collection, StoreError>;
    async fn insert(&self, collection: &str, record: serde_json::Value)
    -> Result<String, StoreError>;
}

/// Exchanges merchant credentials for a provider access token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<String, ProviderError>;
}

/// Submits a push-payment request to the provider.
///
/// Returns the provider's acknowledgment body untouched on success.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn push(
        &self,
        payload: &StkPushPayload,
        token: &AccessToken,
    ) -> Result<serde_json::Value, ProviderError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedRecordStore = Arc<dyn RecordStore>;
pub type SharedAuthProvider = Arc<dyn AuthProvider>;
pub type SharedPaymentProvider = Arc<dyn PaymentProvider>;
pub type SharedClock = Arc<dyn Clock>;
