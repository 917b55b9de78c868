use crate::domain::callback::{
    CallbackAck, CallbackEnvelope, CallbackHandling, CallbackOutcome, CallbackResult,
};

/// Classifies asynchronous payment results.
///
/// Every delivery is acknowledged with result code 0, including bodies that
/// cannot be parsed; a negative ack makes the provider redeliver forever.
/// What to do with the classification is up to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackCorrelator;

impl CallbackCorrelator {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, raw: &[u8]) -> CallbackHandling {
        let outcome = classify(raw);
        let ack = match &outcome {
            CallbackOutcome::Malformed(_) => CallbackAck::received_with_errors(),
            _ => CallbackAck::received(),
        };

        match &outcome {
            CallbackOutcome::Succeeded(result) => tracing::info!(
                merchant_request_id = %result.merchant_request_id,
                checkout_request_id = %result.checkout_request_id,
                "payment successful"
            ),
            CallbackOutcome::Failed(result) => tracing::info!(
                result_code = result.result_code,
                result_desc = %result.result_desc,
                "payment failed"
            ),
            CallbackOutcome::Unrecognized => {
                tracing::warn!("callback without stkCallback envelope")
            }
            CallbackOutcome::Malformed(reason) => {
                tracing::warn!(%reason, "callback processing error")
            }
        }

        CallbackHandling { ack, outcome }
    }
}

fn classify(raw: &[u8]) -> CallbackOutcome {
    let envelope: CallbackEnvelope = match serde_json::from_slice(raw) {
        Ok(envelope) => envelope,
        Err(e) => return CallbackOutcome::Malformed(e.to_string()),
    };

    match envelope.body.and_then(|body| body.stk_callback) {
        Some(callback) => {
            let result = CallbackResult::from(callback);
            if result.is_success() {
                CallbackOutcome::Succeeded(result)
            } else {
                CallbackOutcome::Failed(result)
            }
        }
        None => CallbackOutcome::Unrecognized,
    }
}
