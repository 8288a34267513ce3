use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use shared::{
    domain::{ChatPayload, ImagePayload, PendingRequest},
    error::WebhookError,
    protocol::{ChatWebhookRequest, ImageWebhookRequest, WebhookReply},
};
use tracing::{debug, warn};

pub const DEFAULT_CHAT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/chat";
pub const DEFAULT_IMAGE_WEBHOOK_URL: &str = "http://localhost:5678/webhook/image-analysis";
pub const DEFAULT_WEBHOOK_USER: &str = "dashboard";
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_ERROR_BODY_CHARS: usize = 200;

#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn send_chat(&self, payload: &ChatPayload) -> Result<String, WebhookError>;
    async fn analyze_image(&self, payload: &ImagePayload) -> Result<String, WebhookError>;
}

/// Routes a queued request to the endpoint for its kind.
pub async fn dispatch(
    client: &dyn WebhookClient,
    request: &PendingRequest,
) -> Result<String, WebhookError> {
    match request {
        PendingRequest::ChatMessage(chat) => client.send_chat(chat).await,
        PendingRequest::ImageAnalysis(image) => client.analyze_image(image).await,
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub chat_url: String,
    pub image_url: String,
    pub user: String,
    pub chat_timeout: Duration,
    pub image_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            chat_url: DEFAULT_CHAT_WEBHOOK_URL.into(),
            image_url: DEFAULT_IMAGE_WEBHOOK_URL.into(),
            user: DEFAULT_WEBHOOK_USER.into(),
            chat_timeout: DEFAULT_CHAT_TIMEOUT,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct HttpWebhookClient {
    client: Client,
    config: WebhookConfig,
}

impl HttpWebhookClient {
    pub fn new(config: WebhookConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: WebhookConfig) -> Self {
        Self { client, config }
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<String, WebhookError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport(e, timeout))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_transport(e, timeout))?;

        if status != StatusCode::OK {
            warn!(%url, status = status.as_u16(), "webhook returned non-200 status");
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body: truncate_chars(text.trim(), MAX_ERROR_BODY_CHARS),
            });
        }
        parse_reply(&text)
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn send_chat(&self, payload: &ChatPayload) -> Result<String, WebhookError> {
        let body = ChatWebhookRequest {
            message: payload.text.clone(),
            user: self.config.user.clone(),
        };
        debug!(url = %self.config.chat_url, "posting chat webhook");
        self.post(&self.config.chat_url, &body, self.config.chat_timeout)
            .await
    }

    async fn analyze_image(&self, payload: &ImagePayload) -> Result<String, WebhookError> {
        let body = ImageWebhookRequest {
            image: STANDARD.encode(&payload.bytes),
            filename: payload.filename.clone(),
            prompt: payload.prompt.clone(),
            user: self.config.user.clone(),
        };
        debug!(
            url = %self.config.image_url,
            filename = %payload.filename,
            bytes = payload.bytes.len(),
            "posting image webhook"
        );
        self.post(&self.config.image_url, &body, self.config.image_timeout)
            .await
    }
}

/// Extracts the `response` string from a webhook reply body.
pub fn parse_reply(body: &str) -> Result<String, WebhookError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| WebhookError::MalformedResponse(e.to_string()))?;
    if value.get("response").is_none() {
        return Err(WebhookError::MissingResponse);
    }
    let reply: WebhookReply = serde_json::from_value(value)
        .map_err(|e| WebhookError::MalformedResponse(e.to_string()))?;
    Ok(reply.response)
}

fn map_transport(err: reqwest::Error, timeout: Duration) -> WebhookError {
    if err.is_timeout() {
        WebhookError::Timeout { after: timeout }
    } else {
        WebhookError::Transport(err.to_string())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
