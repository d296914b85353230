use serde::{Deserialize, Serialize};

use crate::domain::order::OrderDraft;
use crate::flows::ConversationState;

/// Identifies one conversation: the bot endpoint that received the message
/// and the counterparty who sent it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    pub endpoint_id: String,
    pub counterparty_id: String,
}

impl ConversationKey {
    pub fn new(endpoint_id: impl Into<String>, counterparty_id: impl Into<String>) -> Self {
        Self { endpoint_id: endpoint_id.into(), counterparty_id: counterparty_id.into() }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.endpoint_id, self.counterparty_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub key: ConversationKey,
    pub state: ConversationState,
    pub draft: OrderDraft,
}

impl Conversation {
    /// A conversation seen for the first time starts in `Initial` with an
    /// empty draft that already knows the counterparty phone.
    pub fn start(key: ConversationKey) -> Self {
        let draft = OrderDraft::for_phone(key.counterparty_id.clone());
        Self { key, state: ConversationState::Initial, draft }
    }

    pub fn reset(&mut self) {
        self.state = ConversationState::Initial;
        self.draft.reset();
    }
}
