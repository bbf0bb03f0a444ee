//! The custodial wallet: login sessions, account resolution, signing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::accounts::AccountBackend;
use crate::custody::keys::{HashAlgorithm, KeyPair};
use crate::custody::{
    AccountIdentity, ConfirmationGate, LoginConnection, LoginStatus, LoginStatusCallback,
    SignRequest, SigningOracle, UserInfo,
};
use crate::error::{AccountApiError, CustodyError};
use crate::protocol::encode::{add_user_domain_tag, encode_account_proof};
use crate::protocol::objects::AccountProofRequest;

/// One logged-in custody session.
struct Session {
    provider: String,
    keypair: KeyPair,
    user: UserInfo,
    identity: AccountIdentity,
}

/// Custodial wallet backed by an OAuth login connection and the
/// account-creation backend.
///
/// Logging in with the provider already active is a no-op; a different
/// provider replaces the session. Logout wipes key material.
pub struct Wallet {
    connection: Arc<dyn LoginConnection>,
    accounts: Arc<dyn AccountBackend>,
    hash_algorithm: HashAlgorithm,
    session: RwLock<Option<Session>>,
    on_status: Option<LoginStatusCallback>,
}

impl Wallet {
    pub fn new(
        connection: Arc<dyn LoginConnection>,
        accounts: Arc<dyn AccountBackend>,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            connection,
            accounts,
            hash_algorithm,
            session: RwLock::new(None),
            on_status: None,
        }
    }

    /// Install the out-of-band login status callback.
    pub fn with_status_callback(mut self, callback: LoginStatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    fn emit(&self, status: LoginStatus) {
        if let Some(callback) = &self.on_status {
            callback(status);
        }
    }

    /// Profile details the login provider shared about the current user.
    pub async fn user_info(&self) -> Option<UserInfo> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Clear the session and key material.
    pub async fn logout(&self) {
        let mut session = self.session.write().await;
        if session.take().is_some() {
            debug!("custody session cleared");
        }
    }

    async fn login_inner(&self, provider: &str) -> Result<AccountIdentity, CustodyError> {
        let login = self.connection.connect(provider).await?;
        let keypair = KeyPair::derive(&login.entropy_hex)?;
        let identity = self.ensure_account_on_chain(&keypair).await?;
        info!(provider, address = %identity.address, "custody login established");
        *self.session.write().await = Some(Session {
            provider: provider.to_string(),
            keypair,
            user: login.user,
            identity: identity.clone(),
        });
        self.emit(LoginStatus::LoggedIn);
        Ok(identity)
    }

    /// Get or create the on-chain account for the session public key and
    /// locate the key index matching it.
    async fn ensure_account_on_chain(
        &self,
        keypair: &KeyPair,
    ) -> Result<AccountIdentity, CustodyError> {
        let public_key = keypair.public_key();
        let record = match self.accounts.get_account_info(public_key).await? {
            Some(record) => record,
            None => {
                self.emit(LoginStatus::CreatingAccount);
                self.accounts
                    .create_account(public_key, self.hash_algorithm)
                    .await?
            }
        };
        // A backend that omits the key list implies a fresh single-key
        // account; a populated list must contain our key.
        let key_index = if record.public_keys.is_empty() {
            0
        } else {
            record.key_index_of(public_key).ok_or_else(|| {
                AccountApiError::KeyNotRegistered {
                    address: record.address.clone(),
                }
            })?
        };
        Ok(AccountIdentity {
            address: record.address,
            key_index,
        })
    }

    async fn sign_with_session(&self, message_hex: &str) -> Result<String, CustodyError> {
        let session = self.session.read().await;
        let session = session.as_ref().ok_or(CustodyError::NotLoggedIn)?;
        session
            .keypair
            .sign_message_hex(message_hex, self.hash_algorithm)
    }
}

#[async_trait]
impl SigningOracle for Wallet {
    async fn login(&self, provider: &str) -> Result<AccountIdentity, CustodyError> {
        {
            let session = self.session.read().await;
            if let Some(active) = session.as_ref()
                && active.provider == provider
            {
                return Ok(active.identity.clone());
            }
        }
        let result = self.login_inner(provider).await;
        if let Err(err) = &result {
            self.emit(LoginStatus::Error {
                provider: provider.to_string(),
                reason: err.to_string(),
            });
        }
        result
    }

    async fn account_identity(&self) -> Option<AccountIdentity> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.identity.clone())
    }

    async fn sign_tx_message(&self, encoded_hex: &str) -> Result<String, CustodyError> {
        self.sign_with_session(encoded_hex).await
    }

    async fn sign_user_message(&self, message_hex: &str) -> Result<String, CustodyError> {
        self.sign_with_session(&add_user_domain_tag(message_hex))
            .await
    }

    async fn sign_account_proof(
        &self,
        proof: &AccountProofRequest,
    ) -> Result<String, CustodyError> {
        let address = {
            let session = self.session.read().await;
            let session = session.as_ref().ok_or(CustodyError::NotLoggedIn)?;
            session.identity.address.clone()
        };
        let message = encode_account_proof(&proof.app_identifier, &address, &proof.nonce)?;
        self.sign_with_session(&message).await
    }
}

/// A confirmation gate that approves everything. Useful for embedders that
/// render their own approval UI upstream of the connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApproveGate;

#[async_trait]
impl ConfirmationGate for AutoApproveGate {
    async fn confirm_sign(&self, _request: SignRequest<'_>) -> bool {
        true
    }
}
