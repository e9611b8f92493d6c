use crate::errors::ChatError;
use crate::models::MessageView;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames a client may send: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join(RoomRef),
    Leave(RoomRef),
    Message(IncomingMessage),
    Typing(TypingSignal),
    MarkRead(RoomRef),
    MarkMessageRead(MessageRef),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub client_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub conversation_id: Uuid,
    pub is_typing: bool,
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, ChatError> {
        serde_json::from_str(text).map_err(|err| {
            tracing::warn!("Malformed realtime frame: {}", err);
            ChatError::validation(format!("Malformed event: {err}"))
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => "join",
            ClientEvent::Leave(_) => "leave",
            ClientEvent::Message(_) => "message",
            ClientEvent::Typing(_) => "typing",
            ClientEvent::MarkRead(_) => "markRead",
            ClientEvent::MarkMessageRead(_) => "markMessageRead",
        }
    }
}

/// `sent` once stored, `delivered` when the receiver had a live connection at publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
}

/// Frames the server pushes to connections.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Message(MessageView),
    #[serde(rename_all = "camelCase")]
    Typing {
        conversation_id: Uuid,
        user_id: String,
        is_typing: bool,
    },
    GetOnlineUser(Vec<String>),
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: Uuid,
        reader_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageRead {
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateMessageStatus {
        conversation_id: Uuid,
        message_id: Uuid,
        status: DeliveryStatus,
    },
    #[serde(rename_all = "camelCase")]
    Joined { conversation_id: Uuid },
    Error { error: String },
}

impl ServerEvent {
    pub fn error(err: &ChatError) -> Self {
        ServerEvent::Error {
            error: err.to_string(),
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            tracing::error!("Failed to serialize realtime event: {:?}", err);
            r#"{"event":"error","data":{"error":"Internal error"}}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn parses_tagged_client_events() {
        let id = Uuid::new_v4();
        let join = ClientEvent::parse(&json!({"event": "join", "data": {"conversationId": id}}).to_string())
            .unwrap();
        assert_eq!(join, ClientEvent::Join(RoomRef { conversation_id: id }));

        let typing = ClientEvent::parse(
            &json!({"event": "typing", "data": {"conversationId": id, "isTyping": true}}).to_string(),
        )
        .unwrap();
        assert_eq!(typing.name(), "typing");

        let read = ClientEvent::parse(
            &json!({"event": "markRead", "data": {"conversationId": id}}).to_string(),
        )
        .unwrap();
        assert_eq!(read, ClientEvent::MarkRead(RoomRef { conversation_id: id }));

        let message_id = Uuid::new_v4();
        let receipt = ClientEvent::parse(
            &json!({"event": "markMessageRead", "data": {"conversationId": id, "messageId": message_id}})
                .to_string(),
        )
        .unwrap();
        assert_eq!(receipt.name(), "markMessageRead");
        assert_eq!(
            receipt,
            ClientEvent::MarkMessageRead(MessageRef {
                conversation_id: id,
                message_id
            })
        );
    }

    #[test]
    fn message_optional_fields_default_to_none() {
        let id = Uuid::new_v4();
        let event = ClientEvent::parse(
            &json!({"event": "message", "data": {"conversationId": id, "content": "hi"}}).to_string(),
        )
        .unwrap();
        match event {
            ClientEvent::Message(msg) => {
                assert_eq!(msg.content, "hi");
                assert!(msg.sender_id.is_none());
                assert!(msg.client_token.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn malformed_frames_are_validation_errors() {
        for frame in [
            "not json",
            r#"{"event": "dance", "data": {}}"#,
            r#"{"event": "join", "data": {"conversationId": "not-a-uuid"}}"#,
            r#"{"event": "message", "data": {"conversationId": "6f1c2d0e-8b7a-4c3d-9e2f-1a2b3c4d5e6f"}}"#,
        ] {
            assert!(matches!(
                ClientEvent::parse(frame),
                Err(ChatError::Validation(_))
            ));
        }
    }

    #[test]
    fn server_events_use_camel_case_payloads() {
        let id = Uuid::new_v4();
        let typing: Value = serde_json::from_str(
            &ServerEvent::Typing {
                conversation_id: id,
                user_id: "client-ana".into(),
                is_typing: true,
            }
            .to_text(),
        )
        .unwrap();
        assert_eq!(typing["event"], "typing");
        assert_eq!(typing["data"]["userId"], "client-ana");
        assert_eq!(typing["data"]["isTyping"], true);

        let online: Value =
            serde_json::from_str(&ServerEvent::GetOnlineUser(vec!["a".into()]).to_text()).unwrap();
        assert_eq!(online, json!({"event": "getOnlineUser", "data": ["a"]}));

        let read: Value = serde_json::from_str(
            &ServerEvent::MessagesRead {
                conversation_id: id,
                reader_id: "lawyer-lee".into(),
            }
            .to_text(),
        )
        .unwrap();
        assert_eq!(read["event"], "messagesRead");
        assert_eq!(read["data"]["readerId"], "lawyer-lee");

        let message_id = Uuid::new_v4();
        let receipt: Value = serde_json::from_str(
            &ServerEvent::MessageRead {
                conversation_id: id,
                message_id,
                reader_id: "lawyer-lee".into(),
            }
            .to_text(),
        )
        .unwrap();
        assert_eq!(receipt["event"], "messageRead");
        assert_eq!(receipt["data"]["messageId"], message_id.to_string());

        let status: Value = serde_json::from_str(
            &ServerEvent::UpdateMessageStatus {
                conversation_id: id,
                message_id,
                status: DeliveryStatus::Delivered,
            }
            .to_text(),
        )
        .unwrap();
        assert_eq!(status["event"], "updateMessageStatus");
        assert_eq!(status["data"]["status"], "delivered");
    }

    #[test]
    fn error_event_carries_public_message() {
        let text = ServerEvent::error(&ChatError::StoreUnavailable("pool timed out".into())).to_text();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"event": "error", "data": {"error": "Storage error"}}));
    }
}
