mod memory;
mod postgres;

pub use memory::InMemoryChatStore;
pub use postgres::PgChatStore;

use crate::errors::ChatError;
use crate::models::{Conversation, Message, NewMessage, ParticipantPair};
use uuid::Uuid;

/// Durable conversations and messages.
///
/// `append_message`, `mark_read` and `mark_message_read` are atomic units: either the message and
/// the conversation counters change together, or nothing changes.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Idempotent; concurrent callers for the same pair get the same row.
    async fn find_or_create_conversation(
        &self,
        pair: &ParticipantPair,
    ) -> Result<Conversation, ChatError>;

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, ChatError>;

    /// Newest activity first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError>;

    /// Oldest first, ties in insertion order.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError>;

    async fn append_message(&self, message: NewMessage) -> Result<Message, ChatError>;

    /// Returns how many messages flipped to read.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: &str) -> Result<u64, ChatError>;

    /// Flips a single message addressed to `reader_id`. Returns false when it was
    /// already read or the reader is its sender. The conversation counter drops
    /// by one per flip and never goes below zero.
    async fn mark_message_read(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: &str,
    ) -> Result<bool, ChatError>;

    async fn ping(&self) -> Result<(), ChatError>;
}

/// Checks shared by every backend before a write.
pub(crate) fn check_append(
    conversation: &Conversation,
    message: &NewMessage,
) -> Result<String, ChatError> {
    if !message.has_content() {
        return Err(ChatError::validation("Message content must not be empty"));
    }

    conversation
        .participants
        .other(&message.sender_id)
        .map(str::to_string)
        .ok_or_else(|| ChatError::validation("Sender is not a participant of this conversation"))
}
