use crate::services::SendMessage;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use uuid::Uuid;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversation {
    #[serde(default)]
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub counterpart_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageForm {
    pub conversation_id: Uuid,
    #[validate(min_length = 1)]
    #[validate(max_length = 10000)]
    pub content: String,
    pub receiver: Option<String>,
    #[validate(max_length = 255)]
    pub client_token: Option<String>,
}

impl From<SendMessageForm> for SendMessage {
    fn from(form: SendMessageForm) -> Self {
        SendMessage {
            conversation_id: form.conversation_id,
            content: form.content,
            receiver: form.receiver,
            client_token: form.client_token,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateParticipant {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub participant_id: String,
}
