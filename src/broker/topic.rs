//! Topic management
//!
//! A `Topic` holds the set of subscriber ids for one topic name, and the
//! `TopicIndex` maps names to topics. Topics are created by their first
//! subscriber and pruned when the last one leaves; publishing to a topic
//! that does not exist is a no-op.
//!
//! Concurrency note: callers must synchronize access (the relay keeps the
//! index and the connection registry behind one lock).

use std::collections::{HashMap, HashSet};

use crate::client::ConnectionId;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<ConnectionId>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber to the topic. Duplicate adds are ignored.
    pub fn subscribe(&mut self, id: ConnectionId) {
        self.subscribers.insert(id);
    }

    /// Remove a subscriber from the topic.
    pub fn unsubscribe(&mut self, id: &ConnectionId) {
        self.subscribers.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct TopicIndex {
    topics: HashMap<String, Topic>,
}

impl TopicIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `id` to `topic`, creating the topic if needed. Idempotent.
    pub fn subscribe(&mut self, topic: &str, id: ConnectionId) {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id);
    }

    /// Remove `id` from `topic`; the topic is dropped once empty.
    pub fn unsubscribe(&mut self, topic: &str, id: &ConnectionId) {
        if let Some(t) = self.topics.get_mut(topic) {
            t.unsubscribe(id);
            if t.is_empty() {
                self.topics.remove(topic);
            }
        }
    }

    /// Remove `id` from each of `topics`.
    pub fn unsubscribe_all<'a, I>(&mut self, topics: I, id: &ConnectionId)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for topic in topics {
            self.unsubscribe(topic, id);
        }
    }

    /// Snapshot of the current subscribers of `topic`; empty if it does not exist.
    pub fn subscribers_of(&self, topic: &str) -> Vec<ConnectionId> {
        self.topics
            .get(topic)
            .map(|t| t.subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, topic: &str) -> Option<&Topic> {
        self.topics.get(topic)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
