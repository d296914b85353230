use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use comanda_core::domain::conversation::{Conversation, ConversationKey};
use comanda_core::domain::order::OrderDraft;
use comanda_core::flows::ConversationState;

use super::{ConversationStore, RepositoryError};
use crate::DbPool;

pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationStore for SqlConversationStore {
    async fn load(&self, key: &ConversationKey) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT endpoint_id, counterparty_id, state, draft_json
             FROM conversation_state
             WHERE endpoint_id = ? AND counterparty_id = ?",
        )
        .bind(&key.endpoint_id)
        .bind(&key.counterparty_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let draft_json = serde_json::to_string(&conversation.draft)
            .map_err(|error| RepositoryError::Decode(format!("draft serialization: {error}")))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversation_state (
                endpoint_id,
                counterparty_id,
                state,
                draft_json,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(endpoint_id, counterparty_id) DO UPDATE SET
                state = excluded.state,
                draft_json = excluded.draft_json,
                updated_at = excluded.updated_at",
        )
        .bind(&conversation.key.endpoint_id)
        .bind(&conversation.key.counterparty_id)
        .bind(conversation.state.as_str())
        .bind(draft_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn conversation_from_row(row: SqliteRow) -> Result<Conversation, RepositoryError> {
    let state_raw = row.try_get::<String, _>("state")?;
    let state = state_raw
        .parse::<ConversationState>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let draft_raw = row.try_get::<String, _>("draft_json")?;
    let mut draft: OrderDraft = serde_json::from_str(&draft_raw)
        .map_err(|error| RepositoryError::Decode(format!("draft_json: {error}")))?;
    draft.recompute_total();

    Ok(Conversation {
        key: ConversationKey::new(
            row.try_get::<String, _>("endpoint_id")?,
            row.try_get::<String, _>("counterparty_id")?,
        ),
        state,
        draft,
    })
}
