//! Relay engine
//!
//! This module contains the in-memory relay responsible for:
//! - tracking live connections and the topics each one joined
//! - dispatching inbound envelopes (`chat_connect`, `new_message`)
//! - fanning a published envelope out to every subscriber of its topic
//! - tearing a connection down when its stream ends
//!
//! Concurrency and usage notes:
//! - The connection registry and the topic index live in one `RelayState`
//!   behind a single mutex, so no caller can observe a connection in one
//!   and not the other.
//! - The lock is never held across an await point. Broadcasting snapshots
//!   the subscriber handles under the lock and sends after releasing it;
//!   sends go into unbounded per-connection channels and never block.
//! - The relay is shared as `Arc<Relay>` by every connection task.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::broker::message::{Envelope, MessageType};
use crate::broker::registry::ConnectionRegistry;
use crate::broker::topic::TopicIndex;
use crate::client::{Client, ConnectionId};
use crate::config::RelaySettings;
use crate::payload::{OpaquePayload, PayloadValidator};
use crate::utils::RelayError;

/// Outcome of dispatching one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Subscribed { topic: String },
    Published { topic: String, delivered: usize },
    Ignored { message_type: String },
}

#[derive(Debug, Default)]
pub struct RelayState {
    pub registry: ConnectionRegistry,
    pub topics: TopicIndex,
}

impl RelayState {
    fn join(&mut self, id: &ConnectionId, topic: &str) -> Result<(), RelayError> {
        self.registry.add_topic(id, topic)?;
        self.topics.subscribe(topic, id.clone());
        Ok(())
    }

    fn replace(&mut self, client: Client) {
        let id = client.id.clone();
        if let Some(stale) = self.registry.replace(client) {
            self.topics.unsubscribe_all(&stale, &id);
        }
    }

    fn teardown(&mut self, id: &ConnectionId) -> Result<HashSet<String>, RelayError> {
        let topics = self.registry.remove(id)?;
        self.topics.unsubscribe_all(&topics, id);
        Ok(topics)
    }
}

pub struct Relay {
    state: Mutex<RelayState>,
    validator: Box<dyn PayloadValidator>,
    echo_to_sender: bool,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    /// A relay that broadcasts payloads unchanged and echoes to the sender.
    pub fn new() -> Self {
        Self::with_validator(OpaquePayload)
    }

    pub fn with_validator(validator: impl PayloadValidator + 'static) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            validator: Box::new(validator),
            echo_to_sender: true,
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            validator: settings.payload_schema.validator(),
            echo_to_sender: settings.echo_to_sender,
        }
    }

    /// Whether a publisher subscribed to the topic receives its own message.
    pub fn echo_to_sender(mut self, enabled: bool) -> Self {
        self.echo_to_sender = enabled;
        self
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a newly accepted connection before any of its frames are read.
    ///
    /// A duplicate id replaces the stale record and unwinds its topics.
    pub fn connect(&self, client: Client) {
        let id = client.id.clone();
        let mut state = self.lock();

        if let Err(err) = state.registry.register(client.clone()) {
            warn!(connection = %id, error = %err, "replacing stale connection record");
            state.replace(client);
        }

        info!(connection = %id, "connection registered");
    }

    /// Entry point for one inbound text frame. Every failure is logged and
    /// absorbed; the connection keeps being served.
    pub fn handle_frame(&self, id: &ConnectionId, text: &str) {
        match self.process_frame(id, text) {
            Ok(outcome) => debug!(connection = %id, ?outcome, "frame processed"),
            Err(err) => {
                let frame: String = text.chars().take(100).collect();
                error!(connection = %id, error = %err, %frame, "dropping client message");
            }
        }
    }

    pub fn process_frame(&self, id: &ConnectionId, text: &str) -> Result<Dispatch, RelayError> {
        let envelope = Envelope::parse(text)?;
        self.dispatch(id, envelope)
    }

    pub fn dispatch(&self, id: &ConnectionId, envelope: Envelope) -> Result<Dispatch, RelayError> {
        match &envelope.message_type {
            MessageType::ChatConnect => {
                let topic = required_topic(&envelope)?;
                self.subscribe(id, &topic)?;
                info!(connection = %id, %topic, "chat connection");
                Ok(Dispatch::Subscribed { topic })
            }
            MessageType::NewMessage => {
                let topic = required_topic(&envelope)?;
                let payload = self.validator.validate(envelope.payload)?;
                let outbound = Envelope::publish(topic.clone(), payload);
                let delivered = self.publish(id, &outbound)?;
                Ok(Dispatch::Published { topic, delivered })
            }
            MessageType::Unknown(message_type) => {
                warn!(connection = %id, "Received unknown message type {message_type} - skipping!");
                Ok(Dispatch::Ignored {
                    message_type: message_type.clone(),
                })
            }
        }
    }

    /// Add `topic` to the connection's memberships.
    pub fn subscribe(&self, id: &ConnectionId, topic: &str) -> Result<(), RelayError> {
        self.lock().join(id, topic)
    }

    /// Fan `envelope` out to the current subscribers of its topic.
    ///
    /// Returns how many subscribers the frame was handed to. Subscribers that
    /// vanished or whose channel is closed are skipped; only a serialization
    /// failure is an error.
    pub fn publish(&self, from: &ConnectionId, envelope: &Envelope) -> Result<usize, RelayError> {
        let frame = envelope.to_frame()?;

        let recipients: Vec<Client> = {
            let state = self.lock();
            state
                .topics
                .subscribers_of(&envelope.topic)
                .iter()
                .filter(|id| self.echo_to_sender || *id != from)
                .filter_map(|id| state.registry.lookup_handle(id).cloned())
                .collect()
        };

        info!(topic = %envelope.topic, subscribers = recipients.len(), "publishing");

        let mut delivered = 0;
        for client in &recipients {
            match client.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => warn!(error = %err, "skipping subscriber"),
            }
        }
        Ok(delivered)
    }

    /// Tear a connection down. Safe to call repeatedly or for ids that never
    /// finished registering; returns whether anything was removed.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        match self.lock().teardown(id) {
            Ok(topics) => {
                info!(connection = %id, topics = topics.len(), "connection closed, removed from memory");
                true
            }
            Err(err) => {
                debug!(connection = %id, error = %err, "nothing to tear down");
                false
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().topics.subscribers_of(topic).len()
    }

    /// Sorted topics the connection has joined; empty for unknown ids.
    pub fn topics_of(&self, id: &ConnectionId) -> Vec<String> {
        let mut topics: Vec<String> = self
            .lock()
            .registry
            .topics_of(id)
            .map(|topics| topics.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }
}

fn required_topic(envelope: &Envelope) -> Result<String, RelayError> {
    envelope
        .topic()
        .map(str::to_string)
        .ok_or_else(|| RelayError::MissingTopic(envelope.message_type.to_string()))
}
