use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, warn};

/// Destination for formatted alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert; failures are logged, never returned
    async fn notify(&self, text: &str);
}

/// Body of an incoming-webhook post
#[derive(Clone, Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub text: &'a str,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// JSON body with the text properly escaped
    pub fn to_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Posts alerts to a Mattermost incoming webhook
pub struct MattermostNotifier {
    client: reqwest::Client,
    url: String,
}

impl MattermostNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for MattermostNotifier {
    async fn notify(&self, text: &str) {
        let body = match WebhookPayload::new(text).to_body() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode webhook payload");
                return;
            }
        };

        let result = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(status = %response.status(), "Webhook delivered");
            }
            Ok(response) => {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                warn!(%status, response = %detail, "Webhook rejected alert");
            }
            Err(e) => {
                warn!(error = %e, "Webhook delivery failed");
            }
        }
    }
}

/// Prints alerts to stdout instead of posting them
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn notify(&self, text: &str) {
        println!("{}", text);
    }
}
