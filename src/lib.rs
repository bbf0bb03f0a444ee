//! Custodial Flow wallet provider speaking the FCL dapp discovery protocol.
//!
//! A dapp's client library discovers wallets by broadcasting service
//! initiation messages and follows up with view-ready-responses carrying the
//! request body. Flowgate answers those messages: it correlates them to at
//! most one in-flight exchange, authenticates the user against a custodial
//! key backend reached through OAuth login providers, and returns signed
//! protocol envelopes — the dapp never sees key material.
//!
//! The pieces compose bottom-up:
//! - [`protocol`] — wire objects, message classification, canonical signing
//!   encodings, service descriptor derivation. Pure.
//! - [`custody`] — the signing oracle: login connection, key derivation,
//!   the custodial [`custody::wallet::Wallet`], the user confirmation gate.
//! - [`accounts`] — client for the account-creation backend that maps a
//!   custody public key to an on-chain account.
//! - [`connector`] — the exchange state machine and protocol handler.
//! - [`transport`] — pumps a raw message channel through a connector.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use flowgate::accounts::AccountApi;
//! use flowgate::config::{Network, ProviderConfig, load_env};
//! use flowgate::connector::Connector;
//! use flowgate::custody::wallet::{AutoApproveGate, Wallet};
//! use flowgate::transport::{InProcessPort, listen};
//!
//! # async fn run(connection: Arc<dyn flowgate::custody::LoginConnection>) -> anyhow::Result<()> {
//! load_env();
//! let config = ProviderConfig::resolve("flowgate", "0xe467b9dd11fa00df", Network::Mainnet)?;
//! let accounts = Arc::new(AccountApi::new(&config.account_api_url)?);
//! let wallet = Arc::new(Wallet::new(connection, accounts, config.hash_algorithm));
//! let connector = Connector::new(config, wallet, Arc::new(AutoApproveGate));
//!
//! let (port, _inbound, _outbound) = InProcessPort::pair(16);
//! listen(port, &connector).await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod config;
pub mod connector;
pub mod custody;
pub mod error;
pub mod protocol;
pub mod transport;

pub use config::{Network, ProviderConfig};
pub use connector::Connector;
pub use custody::{AccountIdentity, ConfirmationGate, LoginConnection, LoginStatus, SigningOracle};
pub use error::{Error, Result};

/// Install a tracing subscriber honoring `RUST_LOG`.
///
/// Convenience for embedding demos and tests; applications with their own
/// subscriber should skip this. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
