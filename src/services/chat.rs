use crate::connectors::UserDirectory;
use crate::db::ChatStore;
use crate::errors::ChatError;
use crate::models::{
    Conversation, ConversationView, Identity, Message, MessageView, NewMessage, ParticipantPair,
    User, UserSummary,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Chat operations on behalf of an authenticated caller.
///
/// Validation and policy checks run here, before the store is touched.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    directory: Arc<dyn UserDirectory>,
}

/// A send request after transport decoding; the sender is always the caller.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub conversation_id: Uuid,
    pub content: String,
    pub receiver: Option<String>,
    pub client_token: Option<String>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Conversations of the caller, newest activity first, with participant summaries.
    #[tracing::instrument(name = "List conversations.", skip(self), fields(user = %identity.user_id))]
    pub async fn list_conversations(
        &self,
        identity: &Identity,
    ) -> Result<Vec<ConversationView>, ChatError> {
        let conversations = self.store.list_conversations(&identity.user_id).await?;

        let ids: Vec<&str> = conversations
            .iter()
            .flat_map(|c| c.participants.ids())
            .collect();
        let profiles = self.resolve_summaries(ids).await;

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let participants = conversation
                    .participants
                    .ids()
                    .iter()
                    .map(|id| summary_or_unresolved(&profiles, id))
                    .collect();
                ConversationView::new(conversation, participants)
            })
            .collect())
    }

    /// Find or create the conversation between the caller and `counterpart_id`.
    #[tracing::instrument(name = "Open conversation.", skip(self), fields(user = %identity.user_id))]
    pub async fn open_conversation(
        &self,
        identity: &Identity,
        counterpart_id: &str,
    ) -> Result<Conversation, ChatError> {
        let counterpart = self.require_counterpart(identity, counterpart_id).await?;
        ensure_cross_role(identity, &counterpart)?;

        let pair = ParticipantPair::new(&identity.user_id, &counterpart.id)
            .map_err(ChatError::Validation)?;
        self.store.find_or_create_conversation(&pair).await
    }

    /// Whether the caller may open a conversation with `counterpart_id`.
    #[tracing::instrument(name = "Validate counterpart.", skip(self), fields(user = %identity.user_id))]
    pub async fn validate_counterpart(
        &self,
        identity: &Identity,
        counterpart_id: &str,
    ) -> Result<bool, ChatError> {
        let counterpart_id = counterpart_id.trim();
        if counterpart_id.is_empty() {
            return Err(ChatError::validation("participantId is required"));
        }
        if counterpart_id == identity.user_id {
            return Ok(false);
        }

        Ok(self
            .directory
            .get_user(counterpart_id)
            .await?
            .map_or(false, |user| identity.role.can_converse_with(user.role)))
    }

    /// The conversation, provided the caller takes part in it.
    pub async fn conversation_for(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(ChatError::conversation_not_found)?;

        if !conversation.is_participant(&identity.user_id) {
            tracing::warn!(
                user = %identity.user_id,
                %conversation_id,
                "Access to foreign conversation refused"
            );
            return Err(ChatError::NotParticipant);
        }
        Ok(conversation)
    }

    /// History in store order, with sender summaries.
    #[tracing::instrument(name = "List messages.", skip(self), fields(user = %identity.user_id))]
    pub async fn list_messages(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
    ) -> Result<Vec<MessageView>, ChatError> {
        let conversation = self.conversation_for(identity, conversation_id).await?;
        let messages = self.store.list_messages(conversation.id).await?;
        let profiles = self.resolve_summaries(conversation.participants.ids()).await;

        Ok(messages
            .into_iter()
            .map(|message| with_sender(message, &profiles))
            .collect())
    }

    #[tracing::instrument(name = "Send message.", skip(self, request), fields(user = %identity.user_id, conversation_id = %request.conversation_id))]
    pub async fn send_message(
        &self,
        identity: &Identity,
        request: SendMessage,
    ) -> Result<MessageView, ChatError> {
        if request.content.trim().is_empty() {
            return Err(ChatError::validation("Message content must not be empty"));
        }

        let conversation = self
            .conversation_for(identity, request.conversation_id)
            .await?;

        if let Some(receiver) = request.receiver.as_deref().map(str::trim) {
            let expected = conversation.participants.other(&identity.user_id);
            if !receiver.is_empty() && expected != Some(receiver) {
                return Err(ChatError::validation(
                    "Receiver must be the other participant of the conversation",
                ));
            }
        }

        let message = self
            .store
            .append_message(
                NewMessage::new(conversation.id, &identity.user_id, &request.content)
                    .with_client_token(request.client_token),
            )
            .await?;
        tracing::info!(message_id = %message.id, "Message stored");

        let profiles = self.resolve_summaries([identity.user_id.as_str()]).await;
        Ok(with_sender(message, &profiles))
    }

    #[tracing::instrument(name = "Mark conversation read.", skip(self), fields(user = %identity.user_id))]
    pub async fn mark_read(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
    ) -> Result<u64, ChatError> {
        let conversation = self.conversation_for(identity, conversation_id).await?;
        self.store.mark_read(conversation.id, &identity.user_id).await
    }

    /// Read receipt for one message. True when the message flipped to read.
    #[tracing::instrument(name = "Mark message read.", skip(self), fields(user = %identity.user_id))]
    pub async fn mark_message_read(
        &self,
        identity: &Identity,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<bool, ChatError> {
        let conversation = self.conversation_for(identity, conversation_id).await?;
        self.store
            .mark_message_read(conversation.id, message_id, &identity.user_id)
            .await
    }

    /// Users the caller may talk to: lawyers for clients, clients for lawyers.
    #[tracing::instrument(name = "List contacts.", skip(self), fields(user = %identity.user_id))]
    pub async fn contacts(&self, identity: &Identity) -> Result<Vec<UserSummary>, ChatError> {
        let users = self
            .directory
            .list_by_role(identity.role.counterpart())
            .await?;
        Ok(users
            .iter()
            .filter(|u| u.id != identity.user_id)
            .map(User::summary)
            .collect())
    }

    async fn require_counterpart(
        &self,
        identity: &Identity,
        counterpart_id: &str,
    ) -> Result<User, ChatError> {
        let counterpart_id = counterpart_id.trim();
        if counterpart_id.is_empty() {
            return Err(ChatError::validation("counterpartId is required"));
        }
        if counterpart_id == identity.user_id {
            return Err(ChatError::validation(
                "A conversation needs two distinct participants",
            ));
        }

        self.directory
            .get_user(counterpart_id)
            .await?
            .ok_or_else(|| ChatError::validation(format!("Unknown counterpart: {counterpart_id}")))
    }

    /// Directory lookups for views. Failures degrade to id-only summaries.
    async fn resolve_summaries<'a, I>(&self, ids: I) -> HashMap<String, UserSummary>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut profiles = HashMap::new();
        for id in ids {
            if profiles.contains_key(id) {
                continue;
            }
            match self.directory.get_user(id).await {
                Ok(Some(user)) => {
                    profiles.insert(id.to_string(), user.summary());
                }
                Ok(None) => {
                    tracing::debug!(user = %id, "Participant unknown to directory");
                }
                Err(err) => {
                    tracing::warn!(user = %id, "Participant lookup failed: {}", err);
                }
            }
        }
        profiles
    }
}

fn ensure_cross_role(identity: &Identity, counterpart: &User) -> Result<(), ChatError> {
    if identity.role.can_converse_with(counterpart.role) {
        Ok(())
    } else {
        tracing::warn!(
            user = %identity.user_id,
            counterpart = %counterpart.id,
            role = %identity.role,
            "Same-role conversation refused"
        );
        Err(ChatError::PolicyViolation(format!(
            "A {} may only chat with a {}",
            identity.role,
            identity.role.counterpart()
        )))
    }
}

fn summary_or_unresolved(profiles: &HashMap<String, UserSummary>, id: &str) -> UserSummary {
    profiles
        .get(id)
        .cloned()
        .unwrap_or_else(|| UserSummary::unresolved(id))
}

fn with_sender(message: Message, profiles: &HashMap<String, UserSummary>) -> MessageView {
    let sender_profile = Some(summary_or_unresolved(profiles, &message.sender));
    MessageView {
        message,
        sender_profile,
    }
}
