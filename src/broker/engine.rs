//! Broker engine
//!
//! The `Broker` is the client registry and the topic router in one value:
//! - registering and removing clients as connections come and go
//! - recording subscriptions and authentication on a client's own behalf
//! - fanning a publish out to every other subscribed client
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind one lock
//!   (`SharedBroker = Arc<Mutex<Broker>>`). Every insert, removal and fan-out
//!   runs under that lock, so a removal can never race a fan-out snapshot.
//! - Fan-out never performs I/O. Each recipient gets the frame through a
//!   non-blocking `try_send` onto its bounded outbound queue, and the
//!   recipient's own writer task does the socket write. A slow or stuck
//!   subscriber therefore cannot delay other recipients or the publisher.
//! - When a recipient's queue is full the new frame is dropped for that
//!   recipient (drop-new) and a warning is logged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::client::{Client, SessionId};
use crate::transport::message::ServerMessage;
use crate::utils::BrokerError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Lock the shared broker, recovering the guard if a holder panicked.
pub fn lock(broker: &Mutex<Broker>) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct Broker {
    clients: HashMap<SessionId, Client>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedBroker {
        Arc::new(Mutex::new(self))
    }

    /// Insert a client. An id that is already live is rejected so that the
    /// existing session keeps its entry.
    pub fn register_client(&mut self, client: Client) -> Result<(), BrokerError> {
        if self.clients.contains_key(&client.id) {
            return Err(BrokerError::DuplicateSession(client.id));
        }
        debug!(client = %client.id, "registered client");
        self.clients.insert(client.id.clone(), client);
        Ok(())
    }

    /// Remove a client. Removing an absent id is a no-op.
    pub fn remove_client(&mut self, client_id: &str) -> Option<Client> {
        let removed = self.clients.remove(client_id);
        if removed.is_some() {
            debug!(client = %client_id, "removed client");
        }
        removed
    }

    #[cfg(test)]
    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    #[cfg(test)]
    pub fn contains_client(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Run `action` on every client matching `predicate`.
    pub fn for_each_client<P, A>(&self, mut predicate: P, mut action: A)
    where
        P: FnMut(&Client) -> bool,
        A: FnMut(&Client),
    {
        for client in self.clients.values() {
            if predicate(client) {
                action(client);
            }
        }
    }

    pub fn is_authenticated(&self, client_id: &str) -> bool {
        self.clients
            .get(client_id)
            .is_some_and(|client| client.authenticated)
    }

    pub fn mark_authenticated(&mut self, client_id: &str) {
        if let Some(client) = self.clients.get_mut(client_id) {
            client.authenticated = true;
        }
    }

    /// Subscribe a client to a topic. Returns `true` only for a new subscription.
    pub fn subscribe(&mut self, client_id: &str, topic: &str) -> bool {
        match self.clients.get_mut(client_id) {
            Some(client) => client.subscriptions.subscribe(topic),
            None => false,
        }
    }

    /// Queue a frame for one client.
    pub fn send_to(&self, client_id: &str, message: ServerMessage) -> bool {
        match self.clients.get(client_id) {
            Some(client) => enqueue(client, message),
            None => false,
        }
    }

    /// Fan a publish out to every subscriber of `topic` except the sender.
    ///
    /// Returns how many recipients had the frame queued. Delivery failures
    /// are logged per recipient and never surface to the publisher.
    pub fn publish(&self, sender_id: &str, topic: &str, payload: &str) -> usize {
        let message = ServerMessage::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
        };

        let mut queued = 0;
        self.for_each_client(
            |client| client.id != sender_id && client.is_subscribed(topic),
            |client| {
                if enqueue(client, message.clone()) {
                    queued += 1;
                }
            },
        );

        debug!(sender = %sender_id, %topic, recipients = queued, "fan-out complete");
        queued
    }
}

fn enqueue(client: &Client, message: ServerMessage) -> bool {
    match client.sender.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(client = %client.id, "outbound queue full, dropping frame");
            false
        }
        Err(TrySendError::Closed(_)) => {
            warn!(client = %client.id, "outbound queue closed, dropping frame");
            false
        }
    }
}
