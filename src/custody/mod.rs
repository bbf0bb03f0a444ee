//! Custodial key management.
//!
//! The connector never touches key material directly: it talks to a
//! [`SigningOracle`], and signing operations pass through a
//! [`ConfirmationGate`] so the user sees what is being signed. The custody
//! SDK boundary is the [`LoginConnection`] trait; the shipped implementation
//! is [`wallet::Wallet`].

pub mod keys;
pub mod wallet;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::CustodyError;
use crate::protocol::objects::{AccountProofRequest, Signable};

/// The logged-in user's chain identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    /// `0x`-prefixed chain address.
    pub address: String,
    /// Index of the custody public key on the account.
    pub key_index: u32,
}

/// Profile details the login provider shares about the user.
#[derive(Debug, Clone, Default)]
pub struct UserInfo {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Result of a completed OAuth login: key entropy plus profile details.
#[derive(Debug)]
pub struct LoginSession {
    /// Hex-encoded entropy the signing keypair is derived from.
    pub entropy_hex: SecretString,
    pub user: UserInfo,
}

/// The custody SDK boundary: performs the interactive OAuth login for a
/// provider and yields the session entropy.
#[async_trait]
pub trait LoginConnection: Send + Sync {
    async fn connect(&self, provider: &str) -> Result<LoginSession, CustodyError>;
}

/// Out-of-band login progress surface.
///
/// Login failures are reported here and never over the wire: a failed login
/// must not confirm this wallet's identity to an untrusted page.
#[derive(Debug, Clone)]
pub enum LoginStatus {
    CreatingAccount,
    LoggedIn,
    Error { provider: String, reason: String },
}

/// Callback invoked on login status transitions.
pub type LoginStatusCallback = Arc<dyn Fn(LoginStatus) + Send + Sync>;

/// What the user is asked to approve before a signature is produced.
#[derive(Debug)]
pub enum SignRequest<'a> {
    Transaction { signable: &'a Signable },
    Message { message_hex: &'a str },
}

/// User confirmation gate in front of signing operations. Returning `false`
/// declines the exchange.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm_sign(&self, request: SignRequest<'_>) -> bool;
}

/// The asynchronous custody oracle the connector resolves exchanges against.
#[async_trait]
pub trait SigningOracle: Send + Sync {
    /// Authenticate with a login provider and resolve the chain identity.
    async fn login(&self, provider: &str) -> Result<AccountIdentity, CustodyError>;

    /// The currently established identity, if any.
    async fn account_identity(&self) -> Option<AccountIdentity>;

    /// Sign a canonically-encoded transaction message (hex).
    async fn sign_tx_message(&self, encoded_hex: &str) -> Result<String, CustodyError>;

    /// Domain-tag and sign an arbitrary user message (hex).
    async fn sign_user_message(&self, message_hex: &str) -> Result<String, CustodyError>;

    /// Sign the canonical proof-of-account-ownership message.
    async fn sign_account_proof(
        &self,
        proof: &AccountProofRequest,
    ) -> Result<String, CustodyError>;
}
