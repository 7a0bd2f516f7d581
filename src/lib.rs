//! # LiteMsg
//!
//! `litemsg` is a small, in-memory, topic-based publish/subscribe broker.
//! Clients talk to it over plain TCP using newline-delimited JSON frames.
//!
//! ## Core Modules
//!
//! - `broker`: the client registry, topic fan-out and the authentication gate.
//! - `client`: the registry-side record of one connected client.
//! - `config`: layered configuration (defaults, file, environment).
//! - `transport`: wire messages, the line codec and the TCP server.
//! - `console`: an interactive line-oriented client for manual use.
//! - `utils`: shared error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod console;
pub mod transport;
pub mod utils;
