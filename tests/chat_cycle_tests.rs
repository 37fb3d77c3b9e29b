// End-to-end send/receive cycle tests
// These run on a paused clock so every delay can be checked to the millisecond.

mod common;
use common::{advance, new_session, setup_logging};

use educhat::{
    audio::{AudioClip, FileRecorder},
    chat::VOICE_ACKNOWLEDGEMENT,
    error::{AudioError, ChatError},
    simulation::responder::{OPENERS, TOPICS},
    MessageStatus,
};

/// Walk one text cycle along its timeline
#[tokio::test(start_paused = true)]
async fn test_text_cycle_timeline() {
    let (session, backing) = new_session();
    let seeded = session.messages().len();

    let id = session
        .send_text("Can you tell me about **quantum** computing?")
        .unwrap()
        .unwrap();

    // t = 0
    let sent = session.message(&id).unwrap();
    assert_eq!(sent.status, MessageStatus::Sending);
    assert_eq!(sent.user_id, "user1");
    assert_eq!(
        sent.formatted_text.as_deref(),
        Some("Can you tell me about <strong>quantum</strong> computing?")
    );
    assert!(session.peer_typing());
    assert!(session.is_sending());
    assert_eq!(session.messages().len(), seeded + 1);

    // t = 801
    advance(801).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Sent);
    assert!(session.peer_typing());

    // t = 1499
    advance(698).await;
    assert!(session.peer_typing());
    assert_eq!(session.messages().len(), seeded + 1);

    // t = 1501
    advance(2).await;
    assert!(!session.peer_typing());
    assert!(!session.is_sending());
    let messages = session.messages();
    assert_eq!(messages.len(), seeded + 2);
    let reply = messages.last().unwrap();
    assert_eq!(reply.user_id, "ai");
    assert_eq!(reply.status, MessageStatus::Sent);
    assert!(reply.text.contains(TOPICS[0].1));
    assert!(OPENERS.iter().any(|opener| reply.text.starts_with(opener)));
    assert!(reply.formatted_text.is_some());

    // t = 1801
    advance(300).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Delivered);

    // t = 3799
    advance(1998).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Delivered);

    // t = 3801
    advance(2).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Read);
    assert!(session.tasks().in_flight() == 0);

    // Nothing ever fails and the saved copy matches
    assert!(session
        .messages()
        .iter()
        .all(|m| m.status != MessageStatus::Failed));
    let saved = backing.stored().unwrap();
    assert_eq!(saved.messages, session.messages());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_topic_gets_fallback() {
    let (session, _) = new_session();
    session.send_text("Tell me a joke").unwrap();

    advance(1501).await;
    let reply = session.messages().last().cloned().unwrap();
    assert!(reply.text.ends_with(educhat::simulation::responder::FALLBACK));
}

#[tokio::test(start_paused = true)]
async fn test_second_send_is_rejected_until_reply() {
    let (session, _) = new_session();
    session.send_text("What is history?").unwrap();

    match session.send_text("And math?") {
        Err(ChatError::SendInProgress) => (),
        other => panic!("Expected SendInProgress, got {:?}", other),
    }

    advance(1501).await;
    assert!(session.send_text("And math?").unwrap().is_some());
}

/// Cancelling a message stops its progression and its reply
#[tokio::test(start_paused = true)]
async fn test_cancel_stops_pending_chains() {
    let (session, _) = new_session();
    let seeded = session.messages().len();
    let id = session.send_text("Explain science").unwrap().unwrap();

    advance(900).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Sent);

    assert_eq!(session.cancel(&id), 2);
    assert!(!session.peer_typing());
    assert!(!session.is_sending());

    advance(5000).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Sent);
    assert_eq!(session.messages().len(), seeded + 1);
    assert_eq!(session.tasks().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_releases_the_send_slot() {
    let (session, _) = new_session();
    let id = session.send_text("programming").unwrap().unwrap();

    assert_eq!(session.cancel_all(), 2);
    assert!(!session.is_sending());
    assert!(!session.peer_typing());

    // The slot is free again right away
    assert!(session.send_text("math").unwrap().is_some());
    advance(5000).await;
    assert_eq!(session.message(&id).unwrap().status, MessageStatus::Sending);
}

#[tokio::test(start_paused = true)]
async fn test_voice_cycle_acknowledges() {
    let (session, _) = new_session();
    let id = session.send_voice(AudioClip::new(vec![1, 2, 3])).unwrap();

    assert!(session.peer_typing());
    advance(2001).await;

    let messages = session.messages();
    let ack = messages.last().unwrap();
    assert_eq!(ack.text, VOICE_ACKNOWLEDGEMENT);
    assert!(!session.peer_typing());

    advance(2000).await;
    let voice = session.message(&id).unwrap();
    assert_eq!(voice.status, MessageStatus::Read);
    assert!(voice.is_voice());
}

#[tokio::test]
async fn test_denied_recorder_leaves_conversation_untouched() {
    setup_logging();
    let (session, backing) = new_session();
    let before = session.messages();
    let saves = backing.save_count();

    let dir = tempfile::tempdir().unwrap();
    let mut recorder = FileRecorder::new(dir.path().join("missing.webm"));
    match session.record_and_send(&mut recorder).await {
        Err(ChatError::Audio(AudioError::AccessDenied(_))) => (),
        other => panic!("Expected AccessDenied, got {:?}", other),
    }

    assert_eq!(session.messages(), before);
    assert_eq!(backing.save_count(), saves);
    assert!(!session.is_sending());
}

#[tokio::test]
async fn test_empty_recording_is_not_sent() {
    let (session, _) = new_session();
    let before = session.messages().len();

    let file = tempfile::NamedTempFile::new().unwrap();
    let mut recorder = FileRecorder::new(file.path().to_path_buf());
    match session.record_and_send(&mut recorder).await {
        Err(ChatError::Audio(AudioError::EmptyRecording)) => (),
        other => panic!("Expected EmptyRecording, got {:?}", other),
    }
    assert_eq!(session.messages().len(), before);
}

#[tokio::test]
async fn test_recorded_file_is_sent_as_voice() {
    let (session, _) = new_session();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.webm");
    std::fs::write(&path, b"fake webm payload").unwrap();

    let mut recorder = FileRecorder::new(path);
    let id = session.record_and_send(&mut recorder).await.unwrap();

    let message = session.message(&id).unwrap();
    let handle = message.audio_url.unwrap();
    assert!(handle.starts_with("blob:"));
    let clip = session.audio().resolve(&handle).unwrap();
    assert_eq!(clip.data, b"fake webm payload".to_vec());
    assert_eq!(clip.mime_type, "audio/webm");

    session.cancel_all();
}
