use super::{check_append, ChatStore};
use crate::errors::ChatError;
use crate::models::{Conversation, Message, NewMessage, ParticipantPair};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str = "id, participant_low, participant_high, last_message, \
     unread_count, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender, receiver, content, read, client_token, created_at";

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    participant_low: String,
    participant_high: String,
    last_message: String,
    unread_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = ChatError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        let participants = ParticipantPair::new(&row.participant_low, &row.participant_high)
            .map_err(|err| {
                tracing::error!(conversation_id = %row.id, "Corrupt participant pair: {}", err);
                ChatError::StoreUnavailable(err)
            })?;

        Ok(Conversation {
            id: row.id,
            participants,
            last_message: row.last_message,
            unread_count: row.unread_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed store. Queries are checked at runtime so the crate builds
/// without a live database.
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_conversation<'e, E>(executor: E, id: Uuid) -> Result<Option<Conversation>, ChatError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query_span = tracing::info_span!("Fetching conversation by id", %id);
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .instrument(query_span)
            .await?
            .map(Conversation::try_from)
            .transpose()
    }
}

#[async_trait::async_trait]
impl ChatStore for PgChatStore {
    async fn find_or_create_conversation(
        &self,
        pair: &ParticipantPair,
    ) -> Result<Conversation, ChatError> {
        let query_span = tracing::info_span!(
            "Find or create conversation",
            low = %pair.low(),
            high = %pair.high()
        );
        let candidate = Conversation::new(pair.clone());

        let insert = format!(
            "INSERT INTO conversations (id, participant_low, participant_high, last_message, \
                                        unread_count, created_at, updated_at)
             VALUES ($1, $2, $3, '', 0, $4, $4)
             ON CONFLICT (participant_low, participant_high) DO NOTHING
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ConversationRow>(&insert)
            .bind(candidate.id)
            .bind(pair.low())
            .bind(pair.high())
            .bind(candidate.created_at)
            .fetch_optional(&self.pool)
            .instrument(query_span.clone())
            .await?;

        if let Some(row) = inserted {
            tracing::info!(conversation_id = %row.id, "Conversation created");
            return Conversation::try_from(row);
        }

        // lost the race or the pair already existed: read the winner
        let select = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE participant_low = $1 AND participant_high = $2"
        );
        let row = sqlx::query_as::<_, ConversationRow>(&select)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_one(&self.pool)
            .instrument(query_span)
            .await?;
        Conversation::try_from(row)
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, ChatError> {
        Self::fetch_conversation(&self.pool, id).await
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        let query_span = tracing::info_span!("Listing conversations", %user_id);
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE participant_low = $1 OR participant_high = $1
             ORDER BY updated_at DESC, id"
        );
        sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span)
            .await?
            .into_iter()
            .map(Conversation::try_from)
            .collect()
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let query_span = tracing::info_span!("Listing messages", %conversation_id);
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, seq ASC"
        );
        let messages = sqlx::query_as::<_, Message>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .instrument(query_span)
            .await?;
        Ok(messages)
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, ChatError> {
        let query_span = tracing::info_span!(
            "Appending message",
            conversation_id = %message.conversation_id,
            sender = %message.sender_id
        );

        let mut tx = self.pool.begin().await?;

        // row lock serializes appends per conversation and keeps created_at monotonic
        let lock = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 FOR UPDATE"
        );
        let conversation: Conversation = sqlx::query_as::<_, ConversationRow>(&lock)
            .bind(message.conversation_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span.clone())
            .await?
            .ok_or_else(ChatError::conversation_not_found)?
            .try_into()?;
        let receiver = check_append(&conversation, &message)?;

        if let Some(token) = message.client_token.as_deref() {
            let existing = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = $1 AND sender = $2 AND client_token = $3"
            );
            let duplicate = sqlx::query_as::<_, Message>(&existing)
                .bind(conversation.id)
                .bind(&message.sender_id)
                .bind(token)
                .fetch_optional(&mut *tx)
                .instrument(query_span.clone())
                .await?;
            if let Some(duplicate) = duplicate {
                tracing::debug!("Duplicate client token, returning stored message");
                tx.rollback().await?;
                return Ok(duplicate);
            }
        }

        let insert = format!(
            "INSERT INTO messages (id, conversation_id, sender, receiver, content, read,
                                   client_token, created_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6,
                     GREATEST(clock_timestamp(),
                              COALESCE((SELECT MAX(created_at) FROM messages
                                        WHERE conversation_id = $2), clock_timestamp())))
             RETURNING {MESSAGE_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Message>(&insert)
            .bind(Uuid::new_v4())
            .bind(conversation.id)
            .bind(&message.sender_id)
            .bind(&receiver)
            .bind(&message.content)
            .bind(&message.client_token)
            .fetch_one(&mut *tx)
            .instrument(query_span.clone())
            .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message = $2, updated_at = $3, unread_count = unread_count + 1
            WHERE id = $1
            "#,
        )
        .bind(conversation.id)
        .bind(&stored.content)
        .bind(stored.created_at)
        .execute(&mut *tx)
        .instrument(query_span)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, ChatError> {
        let query_span =
            tracing::info_span!("Marking messages read", %conversation_id, %reader_id);
        let mut tx = self.pool.begin().await?;

        if Self::fetch_conversation(&mut *tx, conversation_id)
            .await?
            .is_none()
        {
            return Err(ChatError::conversation_not_found());
        }

        let updated = sqlx::query(
            r#"
            UPDATE messages SET read = TRUE
            WHERE conversation_id = $1 AND receiver = $2 AND read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&mut *tx)
        .instrument(query_span.clone())
        .await?
        .rows_affected();

        sqlx::query(r#"UPDATE conversations SET unread_count = 0 WHERE id = $1"#)
            .bind(conversation_id)
            .execute(&mut *tx)
            .instrument(query_span)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_message_read(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: &str,
    ) -> Result<bool, ChatError> {
        let query_span = tracing::info_span!(
            "Marking message read",
            %conversation_id,
            %message_id,
            %reader_id
        );
        let mut tx = self.pool.begin().await?;

        // lock the conversation first, in the same order as append_message
        let lock = "SELECT id FROM conversations WHERE id = $1 FOR UPDATE";
        if sqlx::query(lock)
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span.clone())
            .await?
            .is_none()
        {
            return Err(ChatError::conversation_not_found());
        }

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 AND conversation_id = $2"
        );
        let message = sqlx::query_as::<_, Message>(&sql)
            .bind(message_id)
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span.clone())
            .await?
            .ok_or_else(|| ChatError::NotFound("Message".to_string()))?;

        if message.read || message.receiver != reader_id {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(r#"UPDATE messages SET read = TRUE WHERE id = $1"#)
            .bind(message_id)
            .execute(&mut *tx)
            .instrument(query_span.clone())
            .await?;
        sqlx::query(
            r#"
            UPDATE conversations SET unread_count = GREATEST(unread_count - 1, 0)
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .execute(&mut *tx)
        .instrument(query_span)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn ping(&self) -> Result<(), ChatError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
