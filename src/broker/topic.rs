//! Topic subscriptions
//!
//! Topics are not stored on their own: a topic exists only as a name inside
//! some client's `Subscriptions`. Subscribing twice is a no-op.
//!
//! Concurrency note: a client's subscriptions live in its registry entry and
//! are only touched while the broker lock is held.

use std::collections::HashSet;

pub type TopicName = String;

#[derive(Debug, Default, Clone)]
pub struct Subscriptions {
    topics: HashSet<TopicName>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a topic. Returns `false` when it was already present.
    pub fn subscribe(&mut self, topic: &str) -> bool {
        if self.topics.contains(topic) {
            return false;
        }
        self.topics.insert(topic.to_string())
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
