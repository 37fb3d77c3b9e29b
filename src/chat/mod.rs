// Chat orchestrator
// Ties user input, the conversation store and the two simulation engines into
// one send/receive cycle per user action. Text and voice cycles live in their
// own files as further `impl ChatSession` blocks.

use chrono::Utc;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioRegistry;
use crate::config::ChatConfig;
use crate::format::format_message_text;
use crate::models::{Message, MessageDraft, MessageStatus, Theme, UserStatus};
use crate::persistence::{PersistedState, StatePersistence};
use crate::simulation::{ResponseGenerator, StatusProgression};
use crate::store::ConversationStore;

pub mod tasks;
pub mod text;
pub mod voice;

pub use tasks::{TaskKind, TaskRegistry, TaskTicket};
pub use voice::VOICE_ACKNOWLEDGEMENT;

// Greeting, question and answer shown on a fresh conversation, oldest first.
// Offsets are minutes before the session started.
const WELCOME_SCRIPT: [(Speaker, &str, i64); 3] = [
    (
        Speaker::Assistant,
        "Hello! I'm your AI educational assistant. I'm here to help you learn more effectively. What would you like to learn about today?",
        5,
    ),
    (Speaker::User, "Can you tell me about quantum computing?", 3),
    (
        Speaker::Assistant,
        "Quantum computing is a fascinating field that uses quantum mechanics to perform computations. Unlike classical computers that use bits (0 or 1), quantum computers use quantum bits or \"qubits\" that can exist in multiple states simultaneously due to a property called superposition.\n\nThis gives quantum computers the potential to solve certain problems much faster than classical computers, especially in areas like cryptography, material science, and complex system modeling.",
        2,
    ),
];

#[derive(Clone, Copy)]
enum Speaker {
    User,
    Assistant,
}

/// One conversation with the simulated assistant. Cheap to clone; clones
/// share the same store, registries and flags.
#[derive(Clone)]
pub struct ChatSession {
    store: Arc<Mutex<ConversationStore>>,
    responder: Arc<ResponseGenerator>,
    progression: Arc<StatusProgression>,
    audio: AudioRegistry,
    tasks: TaskRegistry,
    sending: Arc<AtomicBool>,
    voice_reply_delay: Duration,
    assistant_id: String,
}

impl ChatSession {
    /// Open the conversation held by `persistence`, seeding the welcome
    /// exchange when it has no messages yet.
    pub fn new(config: &ChatConfig, persistence: Box<dyn StatePersistence>) -> Self {
        let store = ConversationStore::open(config, persistence);
        let session = ChatSession {
            store: Arc::new(Mutex::new(store)),
            responder: Arc::new(ResponseGenerator::new(
                &config.assistant.id,
                config.timings.reply_delay(),
            )),
            progression: Arc::new(StatusProgression::new(config.timings.progression_steps())),
            audio: AudioRegistry::new(),
            tasks: TaskRegistry::new(),
            sending: Arc::new(AtomicBool::new(false)),
            voice_reply_delay: config.timings.voice_reply_delay(),
            assistant_id: config.assistant.id.clone(),
        };

        session.reset_transient_state();
        session.seed_welcome_messages();
        session
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store().messages().to_vec()
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        self.store().message(id).cloned()
    }

    pub fn snapshot(&self) -> PersistedState {
        self.store().snapshot()
    }

    pub fn current_user_id(&self) -> String {
        self.store().current_user().id.clone()
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn peer_typing(&self) -> bool {
        self.store().peer_typing()
    }

    /// True while a send cycle is waiting for its reply; input should be
    /// disabled meanwhile.
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    pub fn toggle_theme(&self) -> Theme {
        self.store().toggle_theme()
    }

    pub fn set_user_presence(&self, user_id: &str, status: UserStatus) -> bool {
        self.store().set_user_presence(user_id, status)
    }

    pub fn audio(&self) -> &AudioRegistry {
        &self.audio
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Cancel every pending chain of `message_id`. Cancelling a reply also
    /// releases the typing and sending flags it was holding.
    pub fn cancel(&self, message_id: &str) -> usize {
        let cancelled = self.tasks.cancel(message_id);
        if cancelled
            .iter()
            .any(|kind| matches!(kind, TaskKind::Reply | TaskKind::VoiceReply))
        {
            self.finish_cycle();
        }
        if !cancelled.is_empty() {
            info!("Cancelled {} pending chain(s) for {}", cancelled.len(), message_id);
        }
        cancelled.len()
    }

    /// Cancel everything in flight and release the typing and sending flags
    pub fn cancel_all(&self) -> usize {
        let count = self.tasks.cancel_all();
        self.finish_cycle();
        info!("Cancelled {} pending chain(s)", count);
        count
    }

    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Try to claim the single send slot
    fn begin_cycle(&self) -> bool {
        !self.sending.swap(true, Ordering::SeqCst)
    }

    fn finish_cycle(&self) {
        self.store().set_peer_typing(false);
        self.sending.store(false, Ordering::SeqCst);
    }

    /// Spawn the sent/delivered/read chain for `message_id`
    fn start_progression(&self, message_id: &str) {
        let ticket = self.tasks.register(message_id, TaskKind::Progression);
        let session = self.clone();

        tokio::spawn(async move {
            let progression = session.progression.clone();
            progression
                .run(&ticket.message_id, &ticket.token, |id, status| {
                    session.apply_progress(id, status, &ticket.token);
                })
                .await;
            session.tasks.finish(&ticket);
        });
    }

    // A cancel may land between the engine's own check and the store lock
    fn apply_progress(&self, message_id: &str, status: MessageStatus, cancel: &CancellationToken) -> bool {
        let mut store = self.store();
        if cancel.is_cancelled() {
            return false;
        }
        store.update_status(message_id, status)
    }

    /// Append an assistant reply and close the running cycle. Nothing is
    /// appended once `cancel` has fired; returns whether the reply landed.
    fn deliver_reply(&self, draft: MessageDraft, cancel: &CancellationToken) -> bool {
        let formatted = format_message_text(&draft.text);
        {
            let mut store = self.store();
            if cancel.is_cancelled() {
                debug!("Dropping cancelled reply");
                return false;
            }
            store.set_peer_typing(false);
            store.append_message(draft.with_formatted_text(formatted));
        }
        self.sending.store(false, Ordering::SeqCst);
        true
    }

    // Chains do not survive a restart, so flags persisted mid-cycle are stale
    fn reset_transient_state(&self) {
        self.store().set_peer_typing(false);
    }

    fn seed_welcome_messages(&self) {
        let mut store = self.store();
        if !store.messages().is_empty() {
            return;
        }

        let user_id = store.current_user().id.clone();
        let now = Utc::now();
        for (speaker, text, minutes_ago) in WELCOME_SCRIPT.iter() {
            let author = match speaker {
                Speaker::User => user_id.as_str(),
                Speaker::Assistant => self.assistant_id.as_str(),
            };
            let draft = MessageDraft {
                timestamp: Some(now - chrono::Duration::minutes(*minutes_ago)),
                ..MessageDraft::new(author, text)
                    .with_formatted_text(format_message_text(text))
                    .with_status(MessageStatus::Read)
            };
            store.append_message(draft);
        }
        debug!("Seeded {} welcome messages", WELCOME_SCRIPT.len());
    }
}
