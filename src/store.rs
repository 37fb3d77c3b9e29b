//! Conversation store
//!
//! Sole owner of the message log and the user roster. Everything else reads
//! snapshots and asks the store to mutate. The log only grows, and insertion
//! order is display order.

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::config::ChatConfig;
use crate::models::{
    new_message_id, ActiveChat, Message, MessageDraft, MessageId, MessageStatus, Theme, User,
    UserStatus,
};
use crate::persistence::{PersistedState, StatePersistence};

/// Label shown in place of text for voice messages
pub const VOICE_MESSAGE_LABEL: &str = "🎤 Voice Message";

pub struct ConversationStore {
    messages: Vec<Message>,
    users: Vec<User>,
    current_user: User,
    active_chat: ActiveChat,
    theme: Theme,
    persistence: Box<dyn StatePersistence>,
}

impl ConversationStore {
    /// Build the store from whatever `persistence` holds, falling back to the
    /// configured defaults when nothing was saved or the saved state is unreadable.
    pub fn open(config: &ChatConfig, persistence: Box<dyn StatePersistence>) -> Self {
        let state = match persistence.load() {
            Ok(Some(state)) => {
                info!("Restored conversation with {} messages", state.messages.len());
                state
            }
            Ok(None) => {
                debug!("No saved conversation, starting fresh");
                default_state(config)
            }
            Err(e) => {
                error!("Failed to load saved conversation, starting fresh: {}", e);
                default_state(config)
            }
        };

        ConversationStore {
            messages: state.messages,
            users: state.users,
            current_user: state.current_user,
            active_chat: state.active_chat,
            theme: state.theme,
            persistence,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub fn active_chat(&self) -> &ActiveChat {
        &self.active_chat
    }

    pub fn peer_typing(&self) -> bool {
        self.active_chat.typing
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Append a message. Fields the draft leaves unset get the defaults: a
    /// fresh id, the current time and `Sending`.
    pub fn append_message(&mut self, draft: MessageDraft) -> MessageId {
        let message = Message {
            id: draft.id.unwrap_or_else(new_message_id),
            user_id: draft.user_id,
            text: draft.text,
            formatted_text: draft.formatted_text,
            audio_url: draft.audio_url,
            timestamp: draft.timestamp.unwrap_or_else(Utc::now),
            status: draft.status.unwrap_or(MessageStatus::Sending),
        };
        let id = message.id.clone();

        debug!(
            "Appending message {} from {} ({:?})",
            id, message.user_id, message.status
        );
        self.messages.push(message);
        self.persist();
        id
    }

    /// Append a voice message referencing `audio_url`
    pub fn append_voice_message(&mut self, audio_url: &str, user_id: &str) -> MessageId {
        let draft = MessageDraft {
            audio_url: Some(audio_url.to_string()),
            status: Some(MessageStatus::Sending),
            ..MessageDraft::new(user_id, VOICE_MESSAGE_LABEL)
        };
        self.append_message(draft)
    }

    /// Replace the status of message `id`. Unknown ids and transitions that
    /// would move backwards are ignored; returns whether anything changed.
    pub fn update_status(&mut self, id: &str, status: MessageStatus) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            debug!("Ignoring status {:?} for unknown message {}", status, id);
            return false;
        };

        if !message.status.can_advance_to(status) {
            warn!(
                "Ignoring backward status change for {}: {:?} -> {:?}",
                id, message.status, status
            );
            return false;
        }

        debug!("Message {} status {:?} -> {:?}", id, message.status, status);
        message.status = status;
        self.persist();
        true
    }

    pub fn set_peer_typing(&mut self, typing: bool) {
        if self.active_chat.typing == typing {
            return;
        }
        self.active_chat.typing = typing;
        debug!("Peer typing set to {}", typing);
        self.persist();
    }

    /// Update a user's presence, stamping last-seen when they go offline.
    /// Unknown users are ignored.
    pub fn set_user_presence(&mut self, user_id: &str, status: UserStatus) -> bool {
        let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) else {
            debug!("Ignoring presence {:?} for unknown user {}", status, user_id);
            return false;
        };

        user.status = status;
        if status == UserStatus::Offline {
            user.last_seen = Some(Utc::now());
        }
        if self.current_user.id == user.id {
            self.current_user = user.clone();
        }

        debug!("User {} is now {:?}", user_id, status);
        self.persist();
        true
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        info!("Theme switched to {:?}", self.theme);
        self.persist();
        self.theme
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            messages: self.messages.clone(),
            users: self.users.clone(),
            current_user: self.current_user.clone(),
            active_chat: self.active_chat.clone(),
            theme: self.theme,
        }
    }

    // Write-through. A failed save leaves the in-memory state authoritative.
    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.snapshot()) {
            warn!("Failed to persist conversation state: {}", e);
        }
    }
}

fn default_state(config: &ChatConfig) -> PersistedState {
    let current_user = User::new(&config.user.id, &config.user.name);
    PersistedState {
        messages: Vec::new(),
        users: vec![
            current_user.clone(),
            User::new(&config.assistant.id, &config.assistant.name),
        ],
        current_user,
        active_chat: ActiveChat {
            id: config.chat_id.clone(),
            name: config.chat_name.clone(),
            typing: false,
        },
        theme: Theme::Light,
    }
}
