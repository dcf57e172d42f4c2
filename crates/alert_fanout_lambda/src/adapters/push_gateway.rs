use async_trait::async_trait;
use serde::Serialize;

use crate::runtime::contract::{Platform, PushMessage};

/// Delivery of push notifications to devices.
///
/// `send_bulk` delivers one message to every token in a single request and
/// fails as a whole.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(
        &self,
        platform: Platform,
        device_token: &str,
        message: &PushMessage,
    ) -> Result<(), String>;

    async fn send_bulk(
        &self,
        platform: Platform,
        device_tokens: &[String],
        message: &PushMessage,
    ) -> Result<(), String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    device_token: &'a str,
    priority: &'static str,
    message: &'a PushMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSendRequest<'a> {
    device_tokens: &'a [String],
    priority: &'static str,
    message: &'a PushMessage,
}

/// Relays pushes to an HTTP gateway that fronts the platform transports.
///
/// Endpoints: `POST {base}/{platform}/send` and `POST {base}/{platform}/bulk`.
#[derive(Debug, Clone)]
pub struct HttpPushGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPushGateway {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, platform: Platform, action: &str) -> String {
        format!("{}/{}/{action}", self.base_url, platform.path_segment())
    }

    async fn post(&self, url: String, body: &impl Serialize) -> Result<(), String> {
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|error| format!("push gateway request to {url} failed: {error}"))
    }
}

fn priority(message: &PushMessage) -> &'static str {
    if message.is_urgent() {
        "high"
    } else {
        "normal"
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(
        &self,
        platform: Platform,
        device_token: &str,
        message: &PushMessage,
    ) -> Result<(), String> {
        let request = SendRequest {
            device_token,
            priority: priority(message),
            message,
        };
        self.post(self.endpoint(platform, "send"), &request).await
    }

    async fn send_bulk(
        &self,
        platform: Platform,
        device_tokens: &[String],
        message: &PushMessage,
    ) -> Result<(), String> {
        if device_tokens.is_empty() {
            return Ok(());
        }
        let request = BulkSendRequest {
            device_tokens,
            priority: priority(message),
            message,
        };
        self.post(self.endpoint(platform, "bulk"), &request).await
    }
}
