use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info};

use comanda_core::flows::Reply;

use crate::messages::OutboundMessage;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("send transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers one reply to one counterparty through one channel endpoint.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, endpoint_id: &str, to: &str, reply: &Reply) -> Result<(), SendError>;
}

/// Sends through the WhatsApp Cloud API (`POST {base}/{endpoint}/messages`).
#[derive(Clone, Debug)]
pub struct CloudApiSender {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl CloudApiSender {
    pub fn new(
        base_url: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SendError::Client(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            access_token,
        })
    }

    fn messages_url(&self, endpoint_id: &str) -> String {
        format!("{}/{endpoint_id}/messages", self.base_url)
    }
}

#[async_trait]
impl ChannelSender for CloudApiSender {
    async fn send(&self, endpoint_id: &str, to: &str, reply: &Reply) -> Result<(), SendError> {
        let message = OutboundMessage::from_reply(to, reply);
        let response = self
            .client
            .post(self.messages_url(endpoint_id))
            .bearer_auth(self.access_token.expose_secret())
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected { status: status.as_u16(), body });
        }

        debug!(
            event_name = "egress.whatsapp.sent",
            endpoint_id,
            counterparty_id = to,
            status = status.as_u16(),
            "reply delivered to provider"
        );
        Ok(())
    }
}

/// Used when no access token is configured: replies are logged, not sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnlySender;

#[async_trait]
impl ChannelSender for LogOnlySender {
    async fn send(&self, endpoint_id: &str, to: &str, reply: &Reply) -> Result<(), SendError> {
        info!(
            event_name = "egress.whatsapp.logged",
            endpoint_id,
            counterparty_id = to,
            body = %reply.plain_text(),
            "outbound reply (not sent, no access token)"
        );
        Ok(())
    }
}
