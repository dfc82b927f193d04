use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

pub const GENERIC_REJECTION_MESSAGE: &str =
    "The validation service returned an unexpected response.";

// POST <workflow>/cnh_validation_step_1
#[derive(Debug, Serialize)]
pub struct StepOneRequest {
    pub document_image: String,
    pub qrcode_image: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOneReply {
    pub user_data: Value,
    pub liveness_pid: String,
    pub liveness_url: String,
}

// POST <workflow>/cnh_validation_step_2
#[derive(Debug, Serialize)]
pub struct StepTwoRequest {
    pub user_data: Value,
    pub liveness_pid: String,
}

/// Normalizes a workflow reply and surfaces application-level errors.
///
/// The flow engine sometimes wraps its result in a single-element list, so
/// both `{...}` and `[{...}]` are accepted. A reply carrying an `error` key is
/// turned into [`ValidationError::RemoteRejected`] with the remote `message`.
pub fn unwrap_reply(body: Value) -> Result<Value, ValidationError> {
    let reply = match body {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };

    if let Some(error) = reply.get("error") {
        let message = reply
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(GENERIC_REJECTION_MESSAGE)
            .to_string();

        tracing::warn!(error = %error, message = %message, "Workflow reported an error");

        return Err(ValidationError::RemoteRejected(message));
    }

    Ok(reply)
}

impl StepOneReply {
    pub fn from_reply(reply: Value) -> Result<Self, ValidationError> {
        let user_data = reply.get("user_data").filter(|v| v.is_object()).cloned();
        let liveness_pid = reply.get("liveness_pid").and_then(Value::as_str);
        let liveness_url = reply.get("liveness_url").and_then(Value::as_str);

        match (user_data, liveness_pid, liveness_url) {
            (Some(user_data), Some(liveness_pid), Some(liveness_url)) => Ok(Self {
                user_data,
                liveness_pid: liveness_pid.to_string(),
                liveness_url: liveness_url.to_string(),
            }),
            _ => {
                tracing::warn!("Step one reply is missing user_data, liveness_pid or liveness_url");
                Err(ValidationError::RemoteRejected(
                    GENERIC_REJECTION_MESSAGE.to_string(),
                ))
            }
        }
    }
}

/// Step two has no payload of interest; any object without an error counts.
pub fn check_step_two_reply(reply: &Value) -> Result<(), ValidationError> {
    if reply.is_object() {
        Ok(())
    } else {
        tracing::warn!("Step two reply is not a JSON object");
        Err(ValidationError::RemoteRejected(
            GENERIC_REJECTION_MESSAGE.to_string(),
        ))
    }
}
