use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

use super::notification::{DecodedNotification, NotificationError, PushEnvelope};
use crate::config::env::Config;
use crate::gmail::body::{extract_text, subject};
use crate::gmail::client::GmailClient;

/// Subject and plain-text body of one newly added message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    pub body: String,
}

/// Resolves a Gmail push notification into the messages it announces
#[derive(Debug, Clone)]
pub struct NotificationPipeline {
    config: Arc<Config>,
    http: Client,
}

impl NotificationPipeline {
    pub fn new(config: Arc<Config>, http: Client) -> Self {
        Self { config, http }
    }

    /// Run one notification through history lookup and message fetches
    ///
    /// Returns the records emitted, in history order. Missing data, history
    /// id or credential end the run early with no records; only a malformed
    /// `message.data` is an error.
    pub async fn process(&self, envelope: PushEnvelope) -> Result<Vec<EmailRecord>, NotificationError> {
        let delivery = envelope.summary();
        if !delivery.is_empty() {
            info!("Push delivery: {}", delivery);
        }

        let Some(data) = envelope.data() else {
            info!("No message data found");
            return Ok(Vec::new());
        };

        let notification = DecodedNotification::decode(data)?;
        debug!("Decoded notification: {:?}", notification);

        let Some(history_id) = notification.history_id() else {
            info!("No historyId in decoded notification");
            return Ok(Vec::new());
        };

        let Some(access_token) = self.config.access_token.clone() else {
            info!("Missing ACCESS_TOKEN, skipping history {}", history_id);
            return Ok(Vec::new());
        };

        if let Some(address) = &notification.email_address {
            info!("Resolving history {} for {}", history_id, address);
        }

        let gmail = GmailClient::new(
            self.http.clone(),
            self.config.gmail_api_base.clone(),
            access_token,
        );

        let history = gmail.fetch_history(history_id).await;
        let mut records = Vec::new();

        for entry in &history {
            for added in entry.messages_added.as_deref().unwrap_or_default() {
                let Some(id) = added.message.as_ref().and_then(|m| m.id.as_deref()) else {
                    continue;
                };

                let Some(message) = gmail.fetch_message(id).await else {
                    continue;
                };

                let payload = message.payload.as_ref();
                let mut body = extract_text(payload);
                if body.is_empty() {
                    body = message.snippet.clone().unwrap_or_default();
                }

                let record = EmailRecord {
                    id: id.to_string(),
                    subject: subject(payload),
                    body,
                };

                info!("Fetched email: {}", serde_json::to_string(&record).unwrap_or_default());
                records.push(record);
            }
        }

        debug!("History {} resolved to {} message(s)", history_id, records.len());
        Ok(records)
    }
}
