use std::collections::HashMap;

use tokio::sync::RwLock;

use comanda_core::domain::conversation::{Conversation, ConversationKey};

use super::{ConversationStore, RepositoryError};

/// Process-local store for tests and single-instance runs without a database.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationKey, Conversation>>,
}

impl InMemoryConversationStore {
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(key).cloned().map(|mut conversation| {
            conversation.draft.recompute_total();
            conversation
        }))
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.key.clone(), conversation.clone());
        Ok(())
    }
}
