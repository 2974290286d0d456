use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use log::{debug, error, info};
use std::net::SocketAddr;

use crate::webhook::notification::PushEnvelope;
use crate::webhook::pipeline::NotificationPipeline;

/// Request body cap for every route
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: NotificationPipeline,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/hello", get(hello))
        .route("/webhook/gmail", post(gmail_webhook))
        .route("/pubsub", post(pubsub))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;

    info!("Server is running on port {}", port);

    axum::serve(listener, router(state))
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}

async fn index(uri: Uri) -> StatusCode {
    info!("Request for {}", uri);
    StatusCode::OK
}

async fn hello() -> &'static str {
    "Hello World from the server"
}

async fn pubsub(body: Bytes) -> impl IntoResponse {
    info!("Pubsub received");
    info!("{}", String::from_utf8_lossy(&body));
    (StatusCode::OK, "ok")
}

/// Acknowledge the push immediately and resolve it in a detached task
async fn gmail_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!("Gmail webhook received");

    tokio::spawn(async move {
        debug!("Webhook body: {}", String::from_utf8_lossy(&body));

        let envelope: PushEnvelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                info!("No message data found (body is not a push envelope: {})", e);
                return;
            }
        };

        match state.pipeline.process(envelope).await {
            Ok(records) => debug!("Webhook processing finished with {} email(s)", records.len()),
            Err(e) => error!("Failed to decode Gmail notification: {}", e),
        }
    });

    (StatusCode::OK, "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::Config;
    use base64::prelude::*;
    use mockito::Matcher;
    use std::sync::Arc;
    use std::time::Duration;

    async fn spawn_app(gmail_api_base: String) -> String {
        let config = Config {
            port: 3000,
            access_token: Some("token".to_string()),
            gmail_api_base,
            debug_logs_enabled: false,
            log_file: None,
        };
        let state = AppState {
            pipeline: NotificationPipeline::new(Arc::new(config), reqwest::Client::new()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_hello() {
        let base = spawn_app("http://127.0.0.1:1".to_string()).await;

        let response = reqwest::get(format!("{}/hello", base)).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "Hello World from the server");
    }

    #[tokio::test]
    async fn test_index() {
        let base = spawn_app("http://127.0.0.1:1".to_string()).await;

        let response = reqwest::get(format!("{}/", base)).await.unwrap();

        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pubsub_acknowledges() {
        let base = spawn_app("http://127.0.0.1:1".to_string()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/pubsub", base))
            .body(r#"{"message":{}}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_garbage() {
        let base = spawn_app("http://127.0.0.1:1".to_string()).await;
        let client = reqwest::Client::new();

        for body in ["not json", "{}", r#"{"message":{"data":"***"}}"#] {
            let response = client
                .post(format!("{}/webhook/gmail", base))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap();

            assert_eq!(response.status(), 200);
            assert_eq!(response.text().await.unwrap(), "ok");
        }
    }

    #[tokio::test]
    async fn test_webhook_acks_while_gmail_hangs() {
        // Accepts connections and holds them open without ever answering
        let gmail = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gmail_addr = gmail.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = gmail.accept().await {
                held.push(socket);
            }
        });

        let base = spawn_app(format!("http://{}/gmail/v1", gmail_addr)).await;
        let data = BASE64_URL_SAFE_NO_PAD.encode(br#"{"historyId":"12345"}"#);

        let request = reqwest::Client::new()
            .post(format!("{}/webhook/gmail", base))
            .json(&serde_json::json!({ "message": { "data": data } }))
            .send();
        let response = tokio::time::timeout(Duration::from_secs(1), request)
            .await
            .expect("webhook should reply before Gmail answers")
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_webhook_resolves_in_background() {
        let mut server = mockito::Server::new_async().await;
        let history = server
            .mock("GET", "/gmail/v1/users/me/history")
            .match_query(Matcher::UrlEncoded("startHistoryId".into(), "12345".into()))
            .with_status(200)
            .with_body(r#"{"history":[{"messagesAdded":[{"message":{"id":"m1"}}]}]}"#)
            .create_async()
            .await;
        let message = server
            .mock("GET", "/gmail/v1/users/me/messages/m1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":"m1","snippet":"hello","payload":{}}"#)
            .create_async()
            .await;

        let base = spawn_app(format!("{}/gmail/v1", server.url())).await;
        let data = BASE64_URL_SAFE_NO_PAD.encode(br#"{"historyId":"12345"}"#);

        let response = reqwest::Client::new()
            .post(format!("{}/webhook/gmail", base))
            .json(&serde_json::json!({ "message": { "data": data } }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        // The pipeline runs after the response; wait for it to reach Gmail
        for _ in 0..50 {
            if message.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        history.assert_async().await;
        message.assert_async().await;
    }
}
