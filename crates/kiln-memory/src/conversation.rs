use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Role of a recorded conversation turn.
pub enum ConversationRole {
    System,
    User,
    Assistant,
}

impl ConversationRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One immutable turn of a channel conversation.
pub struct ConversationMessage {
    pub role: ConversationRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Ordered, bounded message history for a single channel.
pub struct Conversation {
    pub messages: Vec<ConversationMessage>,
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            last_updated: now,
        }
    }

    /// A conversation past its expiry is semantically absent: it must be
    /// replaced, not extended, on the next mutating access.
    pub fn is_expired(&self, now: DateTime<Utc>, expiry_ms: i64) -> bool {
        now.signed_duration_since(self.last_updated).num_milliseconds() > expiry_ms
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    #[test]
    fn expiry_is_a_strict_boundary() {
        let conversation = Conversation::new(base_time());
        let expiry_ms = 30 * 60 * 1_000;

        assert!(!conversation.is_expired(base_time(), expiry_ms));
        assert!(!conversation.is_expired(base_time() + Duration::minutes(30), expiry_ms));
        assert!(conversation.is_expired(
            base_time() + Duration::minutes(30) + Duration::milliseconds(1),
            expiry_ms
        ));
    }

    #[test]
    fn role_serializes_snake_case() {
        let encoded = serde_json::to_string(&ConversationRole::Assistant).expect("encode");
        assert_eq!(encoded, "\"assistant\"");
    }
}
