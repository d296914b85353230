use async_trait::async_trait;
use thiserror::Error;

use comanda_core::domain::conversation::{Conversation, ConversationKey};

pub mod conversation;
pub mod memory;

pub use conversation::SqlConversationStore;
pub use memory::InMemoryConversationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable per-(endpoint, counterparty) conversation state.
///
/// Writes are last-write-wins; there is no versioning.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Conversation>, RepositoryError>;
    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError>;

    /// Loads the stored conversation or starts a fresh one for the key.
    async fn load_or_start(&self, key: &ConversationKey) -> Result<Conversation, RepositoryError> {
        Ok(self.load(key).await?.unwrap_or_else(|| Conversation::start(key.clone())))
    }
}
