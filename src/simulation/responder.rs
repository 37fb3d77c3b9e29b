// Scripted assistant replies.
//
// A reply is one canned opener, picked at random, followed by either the
// content block of the first matching topic or a generic fallback. Topics are
// checked in list order and the first keyword found anywhere in the input
// wins; there is no longest-match or multi-topic behavior.

use chrono::Utc;
use log::{debug, info};
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::{new_message_id, Message, MessageStatus};

pub const OPENERS: [&str; 4] = [
    "That's a great question! Let me explain in detail...",
    "I understand what you're asking. Here's what I know about that topic:",
    "This is an interesting topic. Let me share some educational insights:",
    "I'd be happy to explain this concept. Here's a comprehensive overview:",
];

pub const FALLBACK: &str = "I'm designed to help with educational topics across various disciplines. Feel free to ask about specific subjects like quantum computing, artificial intelligence, mathematics, science, history, or programming concepts.";

/// Keyword and the content block appended when it matches, in match order
pub const TOPICS: [(&str, &str); 6] = [
    (
        "quantum",
        "Quantum computing utilizes quantum mechanics principles to process information. Unlike traditional computers that use bits (0 or 1), quantum computers use qubits that can exist in multiple states simultaneously through superposition.",
    ),
    (
        "ai",
        "Artificial Intelligence (AI) refers to systems designed to mimic human intelligence. Machine Learning, a subset of AI, enables systems to learn from data without explicit programming. Deep Learning uses neural networks with multiple layers to process complex patterns.",
    ),
    (
        "history",
        "Historical studies provide context for our modern world. By examining past events, societies, and cultures, we can better understand current global dynamics and anticipate future trends.",
    ),
    (
        "math",
        "Mathematics is the universal language that describes patterns and relationships. From basic arithmetic to advanced calculus, it provides tools to model and solve real-world problems across all scientific disciplines.",
    ),
    (
        "science",
        "Scientific inquiry is based on the systematic observation, measurement, and experimentation with phenomena. The scientific method provides a framework for developing and testing hypotheses to expand our understanding of the natural world.",
    ),
    (
        "programming",
        "Programming involves writing instructions for computers to execute. Modern programming paradigms include object-oriented, functional, and event-driven approaches, each with specific use cases and benefits.",
    ),
];

#[derive(Debug, Clone)]
pub struct Topic {
    pub keyword: String,
    pub content: String,
}

impl Topic {
    // Keywords are stored lowercase, input is lowercased before the test
    fn matches(&self, lowered_input: &str) -> bool {
        lowered_input.contains(&self.keyword)
    }
}

pub struct ResponseGenerator {
    author_id: String,
    delay: Duration,
    openers: Vec<String>,
    topics: Vec<Topic>,
    fallback: String,
}

impl ResponseGenerator {
    /// Generator with the built-in openers and topics
    pub fn new(author_id: &str, delay: Duration) -> Self {
        ResponseGenerator {
            author_id: author_id.to_string(),
            delay,
            openers: OPENERS.iter().map(|s| s.to_string()).collect(),
            topics: TOPICS
                .iter()
                .map(|(keyword, content)| Topic {
                    keyword: keyword.to_lowercase(),
                    content: content.to_string(),
                })
                .collect(),
            fallback: FALLBACK.to_string(),
        }
    }

    /// First topic, in list order, whose keyword occurs in `text`
    pub fn select_topic(&self, text: &str) -> Option<&Topic> {
        let lowered = text.to_lowercase();
        self.topics.iter().find(|topic| topic.matches(&lowered))
    }

    /// Assemble the reply text for `user_text`
    pub fn compose(&self, user_text: &str) -> String {
        let opener = self
            .openers
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default();

        match self.select_topic(user_text) {
            Some(topic) => {
                debug!("Reply matched topic '{}'", topic.keyword);
                format!("{} {}", opener, topic.content)
            }
            None => {
                debug!("Reply fell back to the generic answer");
                format!("{} {}", opener, self.fallback)
            }
        }
    }

    /// Build the reply message. Replies start out already `Sent`.
    pub fn reply_to(&self, user_text: &str) -> Message {
        Message {
            id: new_message_id(),
            user_id: self.author_id.clone(),
            text: self.compose(user_text),
            formatted_text: None,
            audio_url: None,
            timestamp: Utc::now(),
            status: MessageStatus::Sent,
        }
    }

    /// Wait out the reply latency, then hand the reply to `on_ready` exactly
    /// once. Returns false without calling `on_ready` if `cancel` fires first.
    pub async fn generate<F>(&self, user_text: &str, cancel: &CancellationToken, on_ready: F) -> bool
    where
        F: FnOnce(Message),
    {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Reply generation cancelled");
                return false;
            }
            _ = tokio::time::sleep(self.delay) => {}
        }

        if cancel.is_cancelled() {
            return false;
        }

        on_ready(self.reply_to(user_text));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn generator() -> ResponseGenerator {
        ResponseGenerator::new("ai", Duration::from_millis(1500))
    }

    fn topic_content(keyword: &str) -> &'static str {
        TOPICS.iter().find(|(k, _)| *k == keyword).unwrap().1
    }

    // Strip whichever opener the reply starts with
    fn split_opener(reply: &str) -> (&'static str, &str) {
        let opener = OPENERS
            .iter()
            .find(|o| reply.starts_with(**o))
            .expect("Reply should start with a canned opener");
        (opener, &reply[opener.len()..])
    }

    #[test]
    fn test_quantum_reply() {
        let reply = generator().compose("Tell me about quantum computing");
        let (_, rest) = split_opener(&reply);
        assert_eq!(rest, format!(" {}", topic_content("quantum")));

        for (keyword, content) in TOPICS.iter().filter(|(k, _)| *k != "quantum") {
            assert!(!reply.contains(content), "Unexpected {} block", keyword);
        }
        assert!(!reply.contains(FALLBACK));
    }

    #[test]
    fn test_fallback_reply() {
        let reply = generator().compose("hello there");
        let (_, rest) = split_opener(&reply);
        assert_eq!(rest, format!(" {}", FALLBACK));
        for (_, content) in TOPICS.iter() {
            assert!(!reply.contains(content));
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let topic = generator().select_topic("What is HISTORY for?").map(|t| t.keyword.clone());
        assert_eq!(topic.as_deref(), Some("history"));
    }

    #[test]
    fn test_first_topic_in_list_order_wins() {
        // "programming" appears first in the text, but "math" comes earlier in the list
        let g = generator();
        assert_eq!(g.select_topic("programming and math").unwrap().keyword, "math");
        // "ai" is a substring of "explain", and it precedes "science"
        assert_eq!(g.select_topic("explain science").unwrap().keyword, "ai");
    }

    #[test]
    fn test_reply_message_fields() {
        let reply = generator().reply_to("math");
        assert!(reply.id.starts_with("msg_"));
        assert_eq!(reply.user_id, "ai");
        assert_eq!(reply.status, MessageStatus::Sent);
        assert!(reply.text.ends_with(topic_content("math")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_waits_for_delay() {
        let g = generator();
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let fired = g
            .generate("science", &token, move |m| sink.lock().unwrap().push(m))
            .await;

        assert!(fired);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_cancelled_never_fires() {
        let g = generator();
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let mut called = false;
        let fired = g.generate("science", &token, |_| called = true).await;

        assert!(!fired);
        assert!(!called);
    }
}
