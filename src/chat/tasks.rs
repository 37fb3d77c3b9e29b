use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::models::MessageId;

/// The deferred chains a message can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Progression, // sent -> delivered -> read
    Reply,       // scripted answer to a text message
    VoiceReply,  // canned acknowledgement of a voice message
}

type TaskKey = (MessageId, TaskKind);

/// Handle given to a running chain. The chain checks `token` before every
/// mutation and passes the ticket back to `finish` when it is done.
#[derive(Debug, Clone)]
pub struct TaskTicket {
    pub message_id: MessageId,
    pub kind: TaskKind,
    pub token: CancellationToken,
    generation: u64,
}

/// Cancellation tokens for every in-flight chain, keyed by message id
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tokens: Arc<Mutex<HashMap<TaskKey, (u64, CancellationToken)>>>,
    next_generation: Arc<AtomicU64>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new chain. A chain already registered under the same key is
    /// cancelled and replaced.
    pub fn register(&self, message_id: &str, kind: TaskKind) -> TaskTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let key = (message_id.to_string(), kind);

        if let Some((_, stale)) = self.lock().insert(key, (generation, token.clone())) {
            info!("Replacing in-flight {:?} chain for {}", kind, message_id);
            stale.cancel();
        }

        TaskTicket {
            message_id: message_id.to_string(),
            kind,
            token,
            generation,
        }
    }

    /// Drop the entry for a chain that ran to completion. Entries that were
    /// replaced since the ticket was issued are left alone.
    pub fn finish(&self, ticket: &TaskTicket) {
        let mut tokens = self.lock();
        let key = (ticket.message_id.clone(), ticket.kind);
        if matches!(tokens.get(&key), Some((generation, _)) if *generation == ticket.generation) {
            tokens.remove(&key);
            debug!("{:?} chain for {} finished", ticket.kind, ticket.message_id);
        }
    }

    /// Cancel every chain owned by `message_id`, returning the kinds cancelled
    pub fn cancel(&self, message_id: &str) -> Vec<TaskKind> {
        let mut tokens = self.lock();
        let keys: Vec<TaskKey> = tokens
            .keys()
            .filter(|(id, _)| id == message_id)
            .cloned()
            .collect();

        let mut cancelled = Vec::new();
        for key in keys {
            if let Some((_, token)) = tokens.remove(&key) {
                token.cancel();
                cancelled.push(key.1);
            }
        }
        cancelled
    }

    /// Cancel everything in flight, returning how many chains were stopped
    pub fn cancel_all(&self) -> usize {
        let mut tokens = self.lock();
        let count = tokens.len();
        for (_, (_, token)) in tokens.drain() {
            token.cancel();
        }
        count
    }

    pub fn is_tracked(&self, message_id: &str, kind: TaskKind) -> bool {
        self.lock().contains_key(&(message_id.to_string(), kind))
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TaskKey, (u64, CancellationToken)>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
