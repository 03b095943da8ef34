//! The chat event distributed by the real-time layer.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of file attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Pdf,
}

/// A file reference carried alongside message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub name: String,
}

/// What a sender supplies when publishing; the rest is stamped at publish time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    /// Recipient user ID. `None` addresses the whole group.
    pub receiver_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

/// A chat message as broadcast to sessions.
///
/// Events are immutable once stamped: two events with equal `id` are equal in
/// every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    /// Dedup key. UUID v4, assigned once.
    pub id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Stamps a draft with a fresh ID and the current wall-clock time.
    ///
    /// The timestamp is truncated to microseconds, the precision the record
    /// store keeps, so a stored event reads back equal to the stamped one.
    pub fn stamp(sender_id: &str, draft: MessageDraft) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: draft.receiver_id,
            content: draft.content,
            attachment: draft.attachment,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Whether this event belongs in `user_id`'s inbox.
    ///
    /// Group messages (no receiver) are relevant to everyone.
    pub fn is_relevant_to(&self, user_id: &str) -> bool {
        match &self.receiver_id {
            None => true,
            Some(receiver) => receiver == user_id || self.sender_id == user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(receiver: Option<&str>) -> MessageDraft {
        MessageDraft {
            receiver_id: receiver.map(str::to_string),
            content: "hello".to_string(),
            attachment: None,
        }
    }

    #[test]
    fn stamp_assigns_unique_ids() {
        let a = ChatEvent::stamp("u-1", draft(None));
        let b = ChatEvent::stamp("u-1", draft(None));
        assert_ne!(a.id, b.id);
        assert_eq!(a.sender_id, "u-1");
    }

    #[test]
    fn relevance_of_direct_message() {
        let event = ChatEvent::stamp("alice", draft(Some("bob")));
        assert!(event.is_relevant_to("alice"));
        assert!(event.is_relevant_to("bob"));
        assert!(!event.is_relevant_to("carol"));
    }

    #[test]
    fn group_message_is_relevant_to_everyone() {
        let event = ChatEvent::stamp("alice", draft(None));
        assert!(event.is_relevant_to("carol"));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let event = ChatEvent::stamp("alice", draft(Some("bob")));
        let json = serde_json::to_value(&event).expect("should serialize");
        assert_eq!(json["senderId"], "alice");
        assert_eq!(json["receiverId"], "bob");
        assert!(json.get("createdAt").is_some());
    }
}
