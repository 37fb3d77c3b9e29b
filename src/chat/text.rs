// Text send cycle:
// validate -> format -> append -> progression -> typing on -> scripted reply
// -> typing off, append reply, release the send slot.

use log::{debug, info};

use super::tasks::TaskKind;
use crate::error::ChatError;
use crate::format::format_message_text;
use crate::models::{MessageDraft, MessageId};

impl super::ChatSession {
    /// Send `input` as the current user. Blank input is a no-op and returns
    /// `Ok(None)`; otherwise the id of the appended message is returned and
    /// the reply arrives in the background.
    pub fn send_text(&self, input: &str) -> Result<Option<MessageId>, ChatError> {
        if input.trim().is_empty() {
            debug!("Ignoring blank input");
            return Ok(None);
        }

        if !self.begin_cycle() {
            return Err(ChatError::SendInProgress);
        }

        let user_id = self.current_user_id();
        let draft = MessageDraft::new(&user_id, input).with_formatted_text(format_message_text(input));
        let message_id = self.store().append_message(draft);
        info!("Sent message {}", message_id);

        self.start_progression(&message_id);
        self.store().set_peer_typing(true);
        self.start_reply(&message_id, input);

        Ok(Some(message_id))
    }

    fn start_reply(&self, message_id: &str, input: &str) {
        let ticket = self.tasks.register(message_id, TaskKind::Reply);
        let session = self.clone();
        let input = input.to_string();

        tokio::spawn(async move {
            let responder = session.responder.clone();
            let delivered = responder
                .generate(&input, &ticket.token, |reply| {
                    session.deliver_reply(MessageDraft::from(reply), &ticket.token);
                })
                .await;
            if delivered {
                debug!("Reply to {} generated", ticket.message_id);
            }
            session.tasks.finish(&ticket);
        });
    }
}
