// Voice send cycle:
// append voice message -> progression -> typing on -> fixed delay
// -> typing off, append the canned acknowledgement, release the send slot.

use log::{debug, info};

use super::tasks::TaskKind;
use crate::audio::{record_clip, AudioClip, AudioRecorder};
use crate::error::ChatError;
use crate::models::{MessageDraft, MessageId, MessageStatus};

pub const VOICE_ACKNOWLEDGEMENT: &str = "I've received your voice message. Is there anything specific you'd like to discuss about that topic?";

impl super::ChatSession {
    /// Send a recorded clip as the current user
    pub fn send_voice(&self, clip: AudioClip) -> Result<MessageId, ChatError> {
        if !self.begin_cycle() {
            return Err(ChatError::SendInProgress);
        }

        let handle = self.audio.register(clip);
        let user_id = self.current_user_id();
        let message_id = self.store().append_voice_message(&handle, &user_id);
        info!("Sent voice message {} ({})", message_id, handle);

        self.start_progression(&message_id);
        self.store().set_peer_typing(true);
        self.start_voice_acknowledgement(&message_id);

        Ok(message_id)
    }

    /// Capture one clip from `recorder` and send it. A denied recorder leaves
    /// the conversation untouched.
    pub async fn record_and_send<R>(&self, recorder: &mut R) -> Result<MessageId, ChatError>
    where
        R: AudioRecorder + ?Sized,
    {
        if self.is_sending() {
            return Err(ChatError::SendInProgress);
        }
        let clip = record_clip(recorder).await?;
        self.send_voice(clip)
    }

    fn start_voice_acknowledgement(&self, message_id: &str) {
        let ticket = self.tasks.register(message_id, TaskKind::VoiceReply);
        let session = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = ticket.token.cancelled() => {
                    debug!("Voice acknowledgement for {} cancelled", ticket.message_id);
                    return;
                }
                _ = tokio::time::sleep(session.voice_reply_delay) => {}
            }

            if ticket.token.is_cancelled() {
                return;
            }

            let draft = MessageDraft::new(&session.assistant_id, VOICE_ACKNOWLEDGEMENT)
                .with_status(MessageStatus::Sent);
            session.deliver_reply(draft, &ticket.token);
            session.tasks.finish(&ticket);
        });
    }
}
