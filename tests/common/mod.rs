// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use log::LevelFilter;

use educhat::{persistence::MemoryStore, ChatConfig, ChatSession};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Fresh session over an in-memory backing store. The returned store shares
/// its slot with the one inside the session.
pub fn new_session() -> (ChatSession, MemoryStore) {
    setup_logging();
    let backing = MemoryStore::new();
    let session = ChatSession::new(&ChatConfig::default(), Box::new(backing.clone()));
    (session, backing)
}

/// Advance the paused clock by `ms` milliseconds
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
