// src/core/conversation.rs — Collapse a conversation into a research topic

use crate::provider::{Message, Role};

/// A single message is the topic as-is. A longer history becomes
/// role-prefixed lines in order; system messages are not part of the topic.
pub fn research_topic(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    let mut topic = String::new();
    for message in messages {
        let prefix = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => continue,
        };
        topic.push_str(prefix);
        topic.push_str(": ");
        topic.push_str(&message.content);
        topic.push('\n');
    }
    topic
}
