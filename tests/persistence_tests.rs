// Conversation state survives a restart through the JSON file backend

mod common;
use common::{advance, setup_logging};

use educhat::{
    audio::AudioClip,
    persistence::{JsonFileStore, MemoryStore, StatePersistence},
    ChatConfig, ChatSession, MessageStatus, Theme, UserStatus,
};

fn open(dir: &std::path::Path) -> ChatSession {
    let config = ChatConfig::default();
    let store = JsonFileStore::new(dir, &config.storage_key);
    ChatSession::new(&config, Box::new(store))
}

#[tokio::test(start_paused = true)]
async fn test_reopen_restores_conversation() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();

    let first = open(dir.path());
    assert_eq!(first.messages().len(), 3);
    let id = first.send_text("Tell me about AI").unwrap().unwrap();
    first.toggle_theme();
    advance(4000).await;
    let expected = first.messages();
    drop(first);

    assert!(dir.path().join("chat-storage.json").exists());

    let second = open(dir.path());
    assert_eq!(second.messages(), expected);
    assert_eq!(second.messages().len(), 5);
    assert_eq!(second.message(&id).unwrap().status, MessageStatus::Read);
    assert_eq!(second.snapshot().theme, Theme::Dark);
}

#[tokio::test(start_paused = true)]
async fn test_restart_mid_cycle_clears_typing() {
    let dir = tempfile::tempdir().unwrap();

    let first = open(dir.path());
    let id = first.send_text("quantum").unwrap().unwrap();
    advance(100).await;
    assert!(first.peer_typing());
    first.cancel_all();
    drop(first);

    let second = open(dir.path());
    assert!(!second.peer_typing());
    assert!(!second.is_sending());
    assert_eq!(second.message(&id).unwrap().status, MessageStatus::Sending);
}

#[tokio::test(start_paused = true)]
async fn test_voice_handles_do_not_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = open(dir.path());
    let id = first.send_voice(AudioClip::new(vec![9; 32])).unwrap();
    advance(4000).await;
    let handle = first.message(&id).unwrap().audio_url.unwrap();
    assert!(first.audio().resolve(&handle).is_some());
    drop(first);

    let second = open(dir.path());
    let restored = second.message(&id).unwrap();
    assert_eq!(restored.audio_url.as_deref(), Some(handle.as_str()));
    assert!(second.audio().resolve(&handle).is_none());
}

#[test]
fn test_corrupt_state_falls_back_to_welcome() {
    setup_logging();
    let backing = MemoryStore::with_raw("{ not json");
    let session = ChatSession::new(&ChatConfig::default(), Box::new(backing.clone()));

    assert_eq!(session.messages().len(), 3);
    let saved = backing.load().unwrap().unwrap();
    assert_eq!(saved.messages.len(), 3);
}

#[test]
fn test_presence_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let config = ChatConfig::default();

    let session = open(dir.path());
    session.set_user_presence("user1", UserStatus::Offline);
    drop(session);

    let saved = JsonFileStore::new(dir.path(), &config.storage_key)
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(saved.current_user.status, UserStatus::Offline);
    assert!(saved.current_user.last_seen.is_some());
}
