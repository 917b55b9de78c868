use serde::{Deserialize, Serialize};

pub const ACK_RECEIVED: &str = "Callback received successfully";
pub const ACK_RECEIVED_WITH_ERRORS: &str = "Callback received with errors";

/// Acknowledgment returned to the provider for every callback delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackAck {
    pub result_code: i32,
    pub result_desc: String,
}

impl CallbackAck {
    pub fn received() -> Self {
        Self {
            result_code: 0,
            result_desc: ACK_RECEIVED.to_string(),
        }
    }

    pub fn received_with_errors() -> Self {
        Self {
            result_code: 0,
            result_desc: ACK_RECEIVED_WITH_ERRORS.to_string(),
        }
    }
}

/// Values the provider attaches to a completed payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentMetadata {
    pub amount: Option<rust_decimal::Decimal>,
    pub receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
}

/// Parsed asynchronous payment result.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub metadata: Option<PaymentMetadata>,
}

impl CallbackResult {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

/// How a single callback delivery was classified.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Succeeded(CallbackResult),
    Failed(CallbackResult),
    /// Parsed, but no `Body.stkCallback` envelope was present.
    Unrecognized,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackHandling {
    pub ack: CallbackAck,
    pub outcome: CallbackOutcome,
}

// Wire shapes of the provider's notification.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CallbackEnvelope {
    pub body: Option<CallbackBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: Option<StkCallback>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub item: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

impl From<CallbackMetadata> for PaymentMetadata {
    fn from(raw: CallbackMetadata) -> Self {
        let mut metadata = PaymentMetadata::default();
        for item in raw.item {
            let Some(value) = item.value else { continue };
            match item.name.as_str() {
                "Amount" => metadata.amount = value_to_decimal(&value),
                "MpesaReceiptNumber" => metadata.receipt_number = value_to_string(&value),
                "TransactionDate" => metadata.transaction_date = value_to_string(&value),
                "PhoneNumber" => metadata.phone_number = value_to_string(&value),
                _ => {}
            }
        }
        metadata
    }
}

impl From<StkCallback> for CallbackResult {
    fn from(raw: StkCallback) -> Self {
        Self {
            merchant_request_id: raw.merchant_request_id,
            checkout_request_id: raw.checkout_request_id,
            result_code: raw.result_code,
            result_desc: raw.result_desc,
            metadata: raw.callback_metadata.map(PaymentMetadata::from),
        }
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_decimal(value: &serde_json::Value) -> Option<rust_decimal::Decimal> {
    value_to_string(value).and_then(|s| s.parse().ok())
}
