use crate::domain::ports::{Collection, RecordStore};
use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct RestStoreSettings {
    pub base_url: String,
    /// Appended as `?auth=` when present.
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for RestStoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStoreSettings")
            .field("base_url", &self.base_url)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Realtime-database style JSON store reached over REST.
///
/// Each collection lives at `{base}/{collection}.json`; appends are `POST`s
/// that answer with the generated key.
pub struct RestRecordStore {
    client: Client,
    settings: RestStoreSettings,
}

impl RestRecordStore {
    pub fn new(settings: RestStoreSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{collection}.json",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.secret {
            Some(secret) => request.query(&[("auth", secret)]),
            None => request,
        }
    }
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn get_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        let response = self
            .with_auth(self.client.get(self.collection_url(collection)))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        into_collection(body)
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let response = self
            .with_auth(self.client.post(self.collection_url(collection)))
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }

        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(pushed.name)
    }
}

/// `null` is an empty collection; arrays are keyed by index with holes dropped.
fn into_collection(body: Value) -> Result<Collection, StoreError> {
    match body {
        Value::Null => Ok(Collection::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {other}"
        ))),
    }
}
