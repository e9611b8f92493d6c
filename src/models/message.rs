use super::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input of an append. The receiver is derived from the conversation.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub client_token: Option<String>,
}

impl NewMessage {
    pub fn new(conversation_id: Uuid, sender_id: &str, content: &str) -> Self {
        Self {
            conversation_id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            client_token: None,
        }
    }

    pub fn with_client_token(mut self, token: Option<String>) -> Self {
        self.client_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Message with the sender profile resolved from the directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_profile: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_content_is_empty() {
        let msg = NewMessage::new(Uuid::new_v4(), "u1", " \n\t ");
        assert!(!msg.has_content());
        assert!(NewMessage::new(Uuid::new_v4(), "u1", " hi ").has_content());
    }

    #[test]
    fn blank_client_token_is_dropped() {
        let msg = NewMessage::new(Uuid::new_v4(), "u1", "hi").with_client_token(Some("  ".into()));
        assert!(msg.client_token.is_none());
    }

    #[test]
    fn view_flattens_message_fields() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender: "a".into(),
            receiver: "b".into(),
            content: "Hello".into(),
            read: false,
            client_token: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(MessageView {
            message,
            sender_profile: Some(UserSummary::unresolved("a")),
        })
        .unwrap();

        assert_eq!(json["content"], "Hello");
        assert_eq!(json["senderProfile"]["id"], "a");
        assert!(json.get("clientToken").is_none());
        assert!(json.get("conversationId").is_some());
    }
}
