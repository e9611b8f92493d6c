use super::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unordered pair of two distinct participants, stored as `(low, high)`.
///
/// This is the uniqueness key of a conversation: `new(a, b) == new(b, a)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ParticipantPair {
    low: String,
    high: String,
}

impl ParticipantPair {
    pub fn new(a: &str, b: &str) -> Result<Self, String> {
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Err("participant id must not be empty".to_string());
        }
        if a == b {
            return Err("a conversation needs two distinct participants".to_string());
        }

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            low: low.to_string(),
            high: high.to_string(),
        })
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The counterpart of `user_id`, or None when `user_id` is not in the pair.
    pub fn other(&self, user_id: &str) -> Option<&str> {
        if self.low == user_id {
            Some(&self.high)
        } else if self.high == user_id {
            Some(&self.low)
        } else {
            None
        }
    }

    pub fn ids(&self) -> [&str; 2] {
        [&self.low, &self.high]
    }
}

impl TryFrom<Vec<String>> for ParticipantPair {
    type Error = String;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        match value.as_slice() {
            [a, b] => ParticipantPair::new(a, b),
            _ => Err("exactly two participants are required".to_string()),
        }
    }
}

impl From<ParticipantPair> for Vec<String> {
    fn from(pair: ParticipantPair) -> Self {
        vec![pair.low, pair.high]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub participants: ParticipantPair,
    pub last_message: String,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(participants: ParticipantPair) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participants,
            last_message: String::new(),
            unread_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.contains(user_id)
    }
}

/// Conversation with resolved participant summaries, as listed to a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub participants: Vec<UserSummary>,
    pub last_message: String,
    pub unread_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationView {
    pub fn new(conversation: Conversation, participants: Vec<UserSummary>) -> Self {
        Self {
            id: conversation.id,
            participants,
            last_message: conversation.last_message,
            unread_count: conversation.unread_count,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}
