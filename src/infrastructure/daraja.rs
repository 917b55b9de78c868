//! M-Pesa Daraja REST client.
//!
//! One `reqwest::Client` serves both the OAuth exchange and STK push
//! submission. Errors are reported as [`ProviderError`] and classified by the
//! application layer.

use crate::domain::payment::{AccessToken, StkPushPayload};
use crate::domain::ports::{AuthProvider, PaymentProvider};
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";

#[derive(Clone)]
pub struct DarajaSettings {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_timeout: Duration,
    pub push_timeout: Duration,
    /// Bind outgoing connections to IPv4 only.
    pub force_ipv4: bool,
}

impl fmt::Debug for DarajaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DarajaSettings")
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .field("token_timeout", &self.token_timeout)
            .field("push_timeout", &self.push_timeout)
            .field("force_ipv4", &self.force_ipv4)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub struct DarajaClient {
    client: Client,
    settings: DarajaSettings,
}

impl DarajaClient {
    pub fn new(settings: DarajaSettings) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if settings.force_ipv4 {
            builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AuthProvider for DarajaClient {
    async fn fetch_token(&self) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(self.url(TOKEN_PATH))
            .basic_auth(
                &self.settings.consumer_key,
                Some(&self.settings.consumer_secret),
            )
            .timeout(self.settings.token_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("token response: {e}")))?;
        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ProviderError::Decode("token response without access_token".to_string()))
    }
}

#[async_trait]
impl PaymentProvider for DarajaClient {
    async fn push(
        &self,
        payload: &StkPushPayload,
        token: &AccessToken,
    ) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(self.url(STK_PUSH_PATH))
            .bearer_auth(token.value())
            .json(payload)
            .timeout(self.settings.push_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("STK push response: {e}")))
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Error bodies are kept as JSON when they parse, else as a plain string.
async fn error_body(response: reqwest::Response) -> Value {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(_) => Value::Null,
    }
}
