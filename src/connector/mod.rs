//! The dapp-facing connector.
//!
//! Correlates inbound FCL messages to at most one in-flight exchange,
//! resolves matched exchanges against the custody oracle, and renders the
//! protocol envelopes going back out. See [`handler::Connector`] for the
//! entry point.

pub mod envelope;
pub mod exchange;
pub mod handler;

pub use exchange::{Exchange, ExchangeState};
pub use handler::Connector;
