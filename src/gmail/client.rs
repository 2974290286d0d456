use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct GmailClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    /// Build a client around a shared HTTP client and an explicit API base
    pub fn new(client: Client, base_url: String, access_token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Fetch every `messageAdded` history record since `start_history_id`
    ///
    /// Best effort: any failure is logged and yields an empty list, so the
    /// caller carries on as if nothing new arrived.
    pub async fn fetch_history(&self, start_history_id: &str) -> Vec<HistoryEntry> {
        match self.list_history_all(start_history_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to fetch history from {}: {:#}", start_history_id, e);
                Vec::new()
            }
        }
    }

    /// Fetch one message in `full` format
    ///
    /// Best effort: any failure is logged and yields `None`.
    pub async fn fetch_message(&self, id: &str) -> Option<GmailMessage> {
        match self.get_message(id).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Failed to fetch message {}: {:#}", id, e);
                None
            }
        }
    }

    async fn list_history_all(&self, start_history_id: &str) -> Result<Vec<HistoryEntry>> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_history(start_history_id, page_token.as_deref()).await?;

            if let Some(history) = page.history {
                entries.extend(history);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    debug!("History has another page, continuing with token {}", token);
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn list_history(
        &self,
        start_history_id: &str,
        page_token: Option<&str>,
    ) -> Result<HistoryResponse> {
        let url = format!("{}/users/me/history", self.base_url);

        let mut query = vec![
            ("startHistoryId", start_history_id),
            ("historyTypes", "messageAdded"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self.client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await
            .context("Failed to send history request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gmail API error ({}): {}", status, error_text);
        }

        let history: HistoryResponse = response.json().await
            .context("Failed to parse history response")?;

        Ok(history)
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);

        let response = self.client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await
            .context("Failed to send message request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gmail API error ({}): {}", status, error_text);
        }

        let message: GmailMessage = response.json().await
            .context("Failed to parse message response")?;

        Ok(message)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HistoryResponse {
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryEntry {
    pub id: Option<String>,
    #[serde(rename = "messagesAdded")]
    pub messages_added: Option<Vec<MessageAdded>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageAdded {
    pub message: Option<MessageRef>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageRef {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GmailMessage {
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageHeader {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub headers: Option<Vec<MessageHeader>>,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessagePartBody {
    pub data: Option<String>,
    pub size: Option<u64>,
}
