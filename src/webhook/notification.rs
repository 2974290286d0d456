use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::gmail::decode::decode_bytes;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("notification data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pub/Sub push request body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PushMessage {
    pub data: Option<String>,
    #[serde(rename = "messageId")]
    pub message_id: Option<String>,
    #[serde(rename = "publishTime")]
    pub publish_time: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushEnvelope {
    /// The encoded Gmail notification, if the envelope carries one
    pub fn data(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Pub/Sub delivery metadata for the log line, omitting absent fields
    pub fn summary(&self) -> String {
        let mut fields = Vec::new();

        if let Some(message) = &self.message {
            if let Some(id) = &message.message_id {
                fields.push(format!("messageId={}", id));
            }
            if let Some(time) = &message.publish_time {
                fields.push(format!("publishTime={}", time));
            }
            if !message.attributes.is_empty() {
                let mut attributes: Vec<_> = message
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                attributes.sort();
                fields.push(format!("attributes=[{}]", attributes.join(", ")));
            }
        }
        if let Some(subscription) = &self.subscription {
            fields.push(format!("subscription={}", subscription));
        }

        fields.join(" ")
    }
}

/// Gmail's notification payload, carried base64-encoded in `message.data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecodedNotification {
    #[serde(rename = "emailAddress")]
    pub email_address: Option<String>,
    #[serde(rename = "historyId", default, deserialize_with = "string_or_number")]
    pub history_id: Option<String>,
}

impl DecodedNotification {
    /// Decode `message.data` into a notification
    pub fn decode(data: &str) -> Result<Self, NotificationError> {
        let bytes = decode_bytes(data)?;
        let notification = serde_json::from_slice(&bytes)?;
        Ok(notification)
    }

    pub fn history_id(&self) -> Option<&str> {
        self.history_id.as_deref().filter(|id| !id.is_empty())
    }
}

// Gmail sends historyId as a JSON number, other publishers as a string
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
