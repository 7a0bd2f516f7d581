//! The `transport` module is responsible for network communication with
//! clients over TCP.
//!
//! It defines the wire messages, the newline-delimited JSON codec, and the
//! server that manages connections and forwards client requests to the
//! broker.

pub mod codec;
pub mod message;
pub mod tcp;

pub use codec::JsonLinesCodec;
pub use message::{ClientMessage, ServerMessage};
pub use tcp::{ConnectionOptions, dispatch, serve, start_tcp_server};

#[cfg(test)]
mod tests;
