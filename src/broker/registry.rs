//! Connection registry
//!
//! Maps a connection id to its outbound handle and the set of topics it has
//! joined. Together with the `TopicIndex` it forms one membership relation,
//! so both are only ever mutated together through the relay engine.

use std::collections::{HashMap, HashSet};

use crate::client::{Client, ConnectionId};
use crate::utils::RelayError;

#[derive(Debug)]
pub struct ConnectionRecord {
    pub client: Client,
    pub topics: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ConnectionRecord>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection with no topics.
    ///
    /// An id that is already present is left untouched and reported as
    /// `DuplicateConnection`.
    pub fn register(&mut self, client: Client) -> Result<(), RelayError> {
        if self.connections.contains_key(&client.id) {
            return Err(RelayError::DuplicateConnection(client.id));
        }
        self.connections.insert(
            client.id.clone(),
            ConnectionRecord {
                client,
                topics: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Install `client` with no topics, overwriting any record with the same
    /// id. Returns the topics of the record that was replaced.
    pub fn replace(&mut self, client: Client) -> Option<HashSet<String>> {
        self.connections
            .insert(
                client.id.clone(),
                ConnectionRecord {
                    client,
                    topics: HashSet::new(),
                },
            )
            .map(|stale| stale.topics)
    }

    /// Record that `id` joined `topic`. Returns `false` if it already had.
    pub fn add_topic(&mut self, id: &ConnectionId, topic: &str) -> Result<bool, RelayError> {
        let record = self
            .connections
            .get_mut(id)
            .ok_or_else(|| RelayError::UnknownConnection(id.clone()))?;
        Ok(record.topics.insert(topic.to_string()))
    }

    /// Delete the record, returning the topics it belonged to.
    pub fn remove(&mut self, id: &ConnectionId) -> Result<HashSet<String>, RelayError> {
        self.connections
            .remove(id)
            .map(|record| record.topics)
            .ok_or_else(|| RelayError::UnknownConnection(id.clone()))
    }

    pub fn lookup_handle(&self, id: &ConnectionId) -> Option<&Client> {
        self.connections.get(id).map(|record| &record.client)
    }

    pub fn topics_of(&self, id: &ConnectionId) -> Option<&HashSet<String>> {
        self.connections.get(id).map(|record| &record.topics)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
