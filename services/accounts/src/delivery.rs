//! Outbound message delivery (email/SMS relay)

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// A message addressed to a single destination
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Sends messages to users
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, destination: &str, message: &Message) -> Result<()>;
}

/// Writes a line to the log instead of sending anything.
///
/// The message body is not logged since it may carry a secret.
#[derive(Debug, Clone, Default)]
pub struct LogDelivery;

#[async_trait]
impl Delivery for LogDelivery {
    async fn send(&self, destination: &str, message: &Message) -> Result<()> {
        info!(
            "Delivery disabled, dropping \"{}\" for {}",
            message.subject, destination
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    destination: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts messages as JSON to an HTTP relay
#[derive(Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Delivery for WebhookDelivery {
    async fn send(&self, destination: &str, message: &Message) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&RelayPayload {
                destination,
                subject: &message.subject,
                body: &message.body,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Relay responded with {}", response.status());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_delivery_always_succeeds() {
        let message = Message {
            subject: "Password reset".to_string(),
            body: "token".to_string(),
        };

        assert!(LogDelivery.send("a@example.com", &message).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_failure_is_an_error() {
        // Nothing listens on port 9 of the loopback interface.
        let delivery = WebhookDelivery::new("http://127.0.0.1:9/relay").unwrap();
        let message = Message {
            subject: "Password reset".to_string(),
            body: "token".to_string(),
        };

        assert!(delivery.send("a@example.com", &message).await.is_err());
    }
}
