use std::net::SocketAddr;

use tokio::sync::mpsc::Sender;

use crate::broker::topic::Subscriptions;
use crate::transport::message::ServerMessage;

/// Unique per live connection: the peer's `ip:port`.
pub type SessionId = String;

/// Represents a connected client in the registry.
///
/// The `sender` feeds the client's bounded outbound queue, which a dedicated
/// writer task drains onto the socket. `authenticated` and `subscriptions`
/// are only changed in response to the client's own frames.
#[derive(Debug)]
pub struct Client {
    pub id: SessionId,
    pub sender: Sender<ServerMessage>,
    pub authenticated: bool,
    pub subscriptions: Subscriptions,
}

impl Client {
    pub fn new(id: impl Into<SessionId>, sender: Sender<ServerMessage>) -> Self {
        Self {
            id: id.into(),
            sender,
            authenticated: false,
            subscriptions: Subscriptions::new(),
        }
    }

    /// Create a client whose id is derived from the remote address.
    pub fn from_peer(peer: SocketAddr, sender: Sender<ServerMessage>) -> Self {
        Self::new(session_id_for(peer), sender)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }
}

pub fn session_id_for(peer: SocketAddr) -> SessionId {
    peer.to_string()
}
