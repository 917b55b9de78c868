use super::AppState;
use crate::application::ussd::UssdRequest;
use crate::domain::callback::{CallbackAck, CallbackOutcome};
use crate::error::{FieldError, PaymentError};
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, FormRejection, JsonRejection};
use axum::extract::{ConnectInfo, Form, State};
use axum::http::HeaderMap;
use serde_json::{Value, json};
use std::net::SocketAddr;

const UNKNOWN_CLIENT: &str = "unknown";

pub async fn stk_push(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, PaymentError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "unreadable STK push body");
        PaymentError::ValidationError(vec![FieldError::new(
            "body",
            "Request body must be a JSON object",
        )])
    })?;

    let client_id = client_identity(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.trust_proxy,
    );
    let phone = field_as_text(&body, "phone");
    let amount = field_as_text(&body, "amount");

    let result = state
        .payments
        .initiate(phone.as_deref(), amount.as_deref(), &client_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "STK Push initiated successfully",
        "data": result.data,
    })))
}

/// Always answers 200; the classified result is stored in the background.
///
/// A body that cannot be buffered (too large, aborted) is acknowledged with
/// errors like any other malformed callback.
pub async fn payment_callback(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Json<CallbackAck> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(%rejection, "unreadable payment callback body");
            return Json(CallbackAck::received_with_errors());
        }
    };
    let handling = state.callbacks.handle(&body);

    if let CallbackOutcome::Succeeded(result) | CallbackOutcome::Failed(result) = handling.outcome
    {
        let records = state.records.clone();
        let received_at = state
            .clock
            .now()
            .with_timezone(&state.local_offset)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        tokio::spawn(async move {
            if records
                .record_payment_callback(&result, &received_at)
                .await
                .is_none()
            {
                tracing::warn!(
                    checkout_request_id = %result.checkout_request_id,
                    "payment callback was not persisted"
                );
            }
        });
    }

    Json(handling.ack)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": state.clock.now().to_rfc3339(),
        "environment": &*state.environment,
    }))
}

/// A turn that is not a readable form is treated as an empty one.
pub async fn ussd(
    State(state): State<AppState>,
    form: Result<Form<UssdRequest>, FormRejection>,
) -> String {
    let request = form.map(|Form(request)| request).unwrap_or_else(|rejection| {
        tracing::debug!(%rejection, "unreadable USSD turn, showing root menu");
        UssdRequest::default()
    });
    state.ussd.handle(&request).await.to_string()
}

/// Rate-limit key for a request.
///
/// Behind a trusted proxy this is the right-most `X-Forwarded-For` entry,
/// the address the proxy itself saw. Otherwise it is the peer address.
pub(crate) fn client_identity(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|xff| xff.rsplit(',').map(str::trim).find(|s| !s.is_empty()));
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Accepts numbers as well as strings; `null` counts as absent.
fn field_as_text(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
