//! Callback delivery.

use log::{debug, warn};

use crate::models::NotificationPayload;

/// Terminal queue operation a finished delivery asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered: remove the task.
    Ack,
    /// Delivery failed: set the task aside for operator inspection.
    Bury,
}

/// A finished delivery, reported back to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Id of the task the delivery belonged to.
    pub job_id: u64,
    /// Requested terminal operation.
    pub outcome: Outcome,
}

/// POSTs the notification to its callback URL.
///
/// The body is the payload's fields as a JSON object; the callback URL itself
/// is never part of the body. Any response at all counts as delivered, even an
/// error status: the callback endpoint received the notification and what it
/// does with it is its own business. Only a transport failure asks for a bury.
pub async fn deliver_notification(
    client: &reqwest::Client,
    payload: &NotificationPayload,
) -> Outcome {
    let body = serde_json::Value::Object(payload.fields.clone());
    match client.post(&payload.callback_url).json(&body).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                debug!("notified {}", payload.callback_url);
            } else {
                warn!("callback {} answered {status}", payload.callback_url);
            }
            Outcome::Ack
        }
        Err(e) => {
            warn!("failed to reach callback {}: {e}", payload.callback_url);
            Outcome::Bury
        }
    }
}
