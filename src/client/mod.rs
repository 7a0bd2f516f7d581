//! The `client` module defines the registry-side representation of a
//! connected client: its session id, authentication flag, subscribed topics
//! and the handle to its outbound queue.

pub mod pubsub_client;
pub use pubsub_client::{Client, SessionId, session_id_for};
