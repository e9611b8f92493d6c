use super::{check_append, ChatStore};
use crate::errors::ChatError;
use crate::models::{Conversation, Message, NewMessage, ParticipantPair};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    conversations: HashMap<Uuid, Conversation>,
    by_pair: HashMap<ParticipantPair, Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
}

/// Process-local store. Every write holds the table lock for its whole unit,
/// so appends and read-marks are atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryChatStore {
    tables: RwLock<Tables>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ChatStore for InMemoryChatStore {
    #[tracing::instrument(name = "Find or create conversation (memory).", skip(self))]
    async fn find_or_create_conversation(
        &self,
        pair: &ParticipantPair,
    ) -> Result<Conversation, ChatError> {
        let mut tables = self.tables.write().await;
        if let Some(id) = tables.by_pair.get(pair) {
            if let Some(existing) = tables.conversations.get(id) {
                return Ok(existing.clone());
            }
        }

        let conversation = Conversation::new(pair.clone());
        tables.by_pair.insert(pair.clone(), conversation.id);
        tables.messages.insert(conversation.id, Vec::new());
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        tracing::info!(conversation_id = %conversation.id, "Conversation created");

        Ok(conversation)
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, ChatError> {
        Ok(self.tables.read().await.conversations.get(&id).cloned())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        let tables = self.tables.read().await;
        let mut list: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        Ok(self
            .tables
            .read()
            .await
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    #[tracing::instrument(name = "Append message (memory).", skip(self, message), fields(conversation_id = %message.conversation_id))]
    async fn append_message(&self, message: NewMessage) -> Result<Message, ChatError> {
        let mut tables = self.tables.write().await;
        let Tables {
            conversations,
            messages,
            ..
        } = &mut *tables;

        let conversation = conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(ChatError::conversation_not_found)?;
        let receiver = check_append(conversation, &message)?;
        let thread = messages.entry(conversation.id).or_default();

        if let Some(token) = message.client_token.as_deref() {
            if let Some(existing) = thread.iter().find(|m| {
                m.sender == message.sender_id && m.client_token.as_deref() == Some(token)
            }) {
                tracing::debug!("Duplicate client token, returning stored message");
                return Ok(existing.clone());
            }
        }

        // keep createdAt non-decreasing within the thread even if the clock steps back
        let mut created_at = Utc::now();
        if let Some(last) = thread.last() {
            if last.created_at > created_at {
                created_at = last.created_at;
            }
        }

        let stored = Message {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            sender: message.sender_id,
            receiver,
            content: message.content,
            read: false,
            client_token: message.client_token,
            created_at,
        };
        thread.push(stored.clone());

        conversation.last_message = stored.content.clone();
        conversation.updated_at = created_at;
        conversation.unread_count = conversation.unread_count.saturating_add(1);

        Ok(stored)
    }

    #[tracing::instrument(name = "Mark messages read (memory).", skip(self))]
    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, ChatError> {
        let mut tables = self.tables.write().await;
        let Tables {
            conversations,
            messages,
            ..
        } = &mut *tables;

        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or_else(ChatError::conversation_not_found)?;

        let mut updated = 0u64;
        if let Some(thread) = messages.get_mut(&conversation_id) {
            for message in thread
                .iter_mut()
                .filter(|m| m.receiver == reader_id && !m.read)
            {
                message.read = true;
                updated += 1;
            }
        }
        conversation.unread_count = 0;

        Ok(updated)
    }

    async fn mark_message_read(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: &str,
    ) -> Result<bool, ChatError> {
        let mut tables = self.tables.write().await;
        let Tables {
            conversations,
            messages,
            ..
        } = &mut *tables;

        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or_else(ChatError::conversation_not_found)?;
        let message = messages
            .get_mut(&conversation_id)
            .and_then(|thread| thread.iter_mut().find(|m| m.id == message_id))
            .ok_or_else(|| ChatError::NotFound("Message".to_string()))?;

        if message.read || message.receiver != reader_id {
            return Ok(false);
        }
        message.read = true;
        conversation.unread_count = (conversation.unread_count - 1).max(0);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), ChatError> {
        Ok(())
    }
}
