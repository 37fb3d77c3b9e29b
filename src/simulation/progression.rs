use log::{debug, info};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::MessageStatus;

/// Drives a sent message through sent, delivered and read.
///
/// Each delay starts when the previous step has fired, so the steps land at
/// the running sums of the configured delays (800, 1800 and 3800 ms with the
/// defaults). Nothing here ever produces `Failed`.
#[derive(Debug, Clone)]
pub struct StatusProgression {
    steps: [(Duration, MessageStatus); 3],
}

impl Default for StatusProgression {
    fn default() -> Self {
        StatusProgression::new([
            Duration::from_millis(800),
            Duration::from_millis(1000),
            Duration::from_millis(2000),
        ])
    }
}

impl StatusProgression {
    pub fn new(delays: [Duration; 3]) -> Self {
        StatusProgression {
            steps: [
                (delays[0], MessageStatus::Sent),
                (delays[1], MessageStatus::Delivered),
                (delays[2], MessageStatus::Read),
            ],
        }
    }

    /// Call `update` once per step, in order. Stops early, without calling
    /// `update` again, once `cancel` fires; returns whether all steps ran.
    pub async fn run<F>(&self, message_id: &str, cancel: &CancellationToken, mut update: F) -> bool
    where
        F: FnMut(&str, MessageStatus),
    {
        for (delay, status) in self.steps.iter() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Status progression for {} cancelled", message_id);
                    return false;
                }
                _ = tokio::time::sleep(*delay) => {}
            }

            if cancel.is_cancelled() {
                return false;
            }

            debug!("Progressing {} to {:?}", message_id, status);
            update(message_id, *status);
        }

        true
    }
}
