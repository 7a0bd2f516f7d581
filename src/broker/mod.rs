pub mod auth;
pub mod engine;
pub mod topic;

pub use auth::{AuthGate, AuthOutcome};
pub use engine::{Broker, SharedBroker, lock};
