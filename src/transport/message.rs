//! Wire messages.
//!
//! Every frame is a JSON object tagged by its `"type"` field. Fields a type
//! does not use are omitted on encode and ignored on decode.

use serde::{Deserialize, Serialize};

/// Frames sent from a client to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// `payload` carries `"username:password"`.
    Auth { payload: String },
    Subscribe { topic: String },
    Publish { topic: String, payload: String },
    /// Any `type` the broker does not understand. Ignored.
    #[serde(other)]
    Unknown,
}

/// Frames sent from the broker to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Acknowledges an `auth` frame with `"success"` or `"failed"`.
    Auth { payload: String },
    /// Relay of another client's publish.
    Publish { topic: String, payload: String },
}

impl ServerMessage {
    pub const AUTH_SUCCESS: &'static str = "success";
    pub const AUTH_FAILED: &'static str = "failed";

    pub fn auth_ack(success: bool) -> Self {
        let payload = if success {
            Self::AUTH_SUCCESS
        } else {
            Self::AUTH_FAILED
        };
        ServerMessage::Auth {
            payload: payload.to_string(),
        }
    }
}
