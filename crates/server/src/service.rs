use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use comanda_core::{ConversationEngine, TenantDirectory};
use comanda_db::{ConversationStore, RepositoryError};
use comanda_whatsapp::{ChannelSender, InboundEvent, InboundHandler, SendError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no tenant configured for endpoint `{0}`")]
    UnknownTenant(String),
    #[error("conversation store failed: {0}")]
    Store(#[from] RepositoryError),
    #[error("reply could not be sent: {0}")]
    Send(#[from] SendError),
}

/// One inbound message end to end: resolve tenant, load, step, save, reply.
pub struct ConversationService {
    tenants: TenantDirectory,
    store: Arc<dyn ConversationStore>,
    engine: ConversationEngine,
    sender: Arc<dyn ChannelSender>,
}

impl ConversationService {
    pub fn new(
        tenants: TenantDirectory,
        store: Arc<dyn ConversationStore>,
        engine: ConversationEngine,
        sender: Arc<dyn ChannelSender>,
    ) -> Self {
        Self { tenants, store, engine, sender }
    }
}

#[async_trait]
impl InboundHandler for ConversationService {
    type Error = ServiceError;

    async fn handle(&self, event: &InboundEvent) -> Result<(), Self::Error> {
        let tenant = self
            .tenants
            .resolve(&event.endpoint_id)
            .ok_or_else(|| ServiceError::UnknownTenant(event.endpoint_id.clone()))?;

        info!(
            event_name = "ingress.webhook.message",
            correlation_id = %event.message_id,
            endpoint_id = %event.endpoint_id,
            counterparty_id = %event.counterparty_id,
            kind = event.kind(),
            "processing inbound message"
        );

        let mut conversation = self.store.load_or_start(&event.key()).await?;
        let outcome =
            self.engine.step(&mut conversation, &event.to_inbound(), &tenant, Utc::now()).await;
        self.store.save(&conversation).await?;

        self.sender.send(&event.endpoint_id, &event.counterparty_id, &outcome.reply).await?;
        Ok(())
    }
}
