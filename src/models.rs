use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MessageId = String;
pub type UserId = String;

/// Generate a fresh message id. Random rather than timestamp-derived so two
/// appends inside the same clock tick never collide.
pub fn new_message_id() -> MessageId {
    format!("msg_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
    Typing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>, // Only stamped when going offline
}

impl User {
    pub fn new(id: &str, name: &str) -> Self {
        User {
            id: id.to_string(),
            name: name.to_string(),
            avatar: None,
            status: UserStatus::Online,
            last_seen: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending = 1,   // Created locally, not yet acknowledged
    Sent = 2,      // Accepted by the (simulated) server
    Delivered = 3, // Delivered to the peer
    Read = 4,      // Read by the peer
    Failed = 5,    // Terminal, never produced by the simulated pipeline
}

impl MessageStatus {
    /// Whether moving from `self` to `next` respects the forward-only
    /// lifecycle sending -> sent -> delivered -> read, with an early exit to
    /// failed from any non-terminal state.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        match (self, next) {
            (MessageStatus::Read, _) | (MessageStatus::Failed, _) => false,
            (_, MessageStatus::Failed) => true,
            (current, next) => (next as u8) > (current as u8),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>, // Ephemeral handle from the audio registry
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    pub fn is_voice(&self) -> bool {
        self.audio_url.is_some()
    }

    /// Markup to display: the stored formatted text when present, the raw
    /// text otherwise.
    pub fn display_text(&self) -> &str {
        self.formatted_text.as_deref().unwrap_or(&self.text)
    }
}

/// A message as handed to the store. Unset fields are filled with the
/// store's defaults (fresh id, now, `Sending`).
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub id: Option<MessageId>,
    pub user_id: UserId,
    pub text: String,
    pub formatted_text: Option<String>,
    pub audio_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub status: Option<MessageStatus>,
}

impl MessageDraft {
    pub fn new(user_id: &str, text: &str) -> Self {
        MessageDraft {
            user_id: user_id.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn with_formatted_text(mut self, formatted: String) -> Self {
        self.formatted_text = Some(formatted);
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<Message> for MessageDraft {
    fn from(message: Message) -> Self {
        MessageDraft {
            id: Some(message.id),
            user_id: message.user_id,
            text: message.text,
            formatted_text: message.formatted_text,
            audio_url: message.audio_url,
            timestamp: Some(message.timestamp),
            status: Some(message.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChat {
    pub id: String,
    pub name: String,
    pub typing: bool, // Single peer, so one flag for the whole conversation
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}
