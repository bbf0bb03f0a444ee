//! Client for the account-creation backend.
//!
//! The backend maps a custody public key to an on-chain account, creating
//! one on first use. A missing account is signaled with an error payload
//! ending in "does not exist" (delivered with HTTP 404); that shape maps to
//! `None` rather than an error so callers can fall through to creation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::custody::keys::HashAlgorithm;
use crate::error::{AccountApiError, ConfigError};
use crate::protocol::encode::with_hex_prefix;

/// Signature algorithm identifier sent at account registration.
const SIGNATURE_ALGORITHM: &str = "ECDSA_secp256k1";

/// An account known to the backend.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    /// `0x`-prefixed chain address.
    pub address: String,
    /// Public keys registered on the account, in key-index order.
    pub public_keys: Vec<RegisteredKey>,
}

impl AccountRecord {
    /// Key index of the given public key, if registered.
    pub fn key_index_of(&self, public_key: &str) -> Option<u32> {
        self.public_keys
            .iter()
            .position(|key| key.public_key == public_key)
            .map(|index| index as u32)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredKey {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "signatureAlgorithm", default)]
    pub signature_algorithm: String,
    #[serde(rename = "hashAlgorithm", default)]
    pub hash_algorithm: String,
}

#[derive(Debug, Deserialize)]
struct BackendSuccess {
    address: String,
    #[serde(rename = "publicKeys", default)]
    public_keys: Vec<RegisteredKey>,
}

#[derive(Debug, Deserialize)]
struct BackendError {
    error: String,
}

#[derive(Debug, Serialize)]
struct CreateAccountBody<'a> {
    #[serde(rename = "publicKey")]
    public_key: &'a str,
    #[serde(rename = "signatureAlgorithm")]
    signature_algorithm: &'a str,
    #[serde(rename = "hashAlgorithm")]
    hash_algorithm: &'a str,
}

fn record_from_success(success: BackendSuccess) -> AccountRecord {
    AccountRecord {
        address: with_hex_prefix(&success.address),
        public_keys: success.public_keys,
    }
}

/// Parse a lookup response body. `None` means the account does not exist yet.
fn parse_lookup_body(body: &str) -> Result<Option<AccountRecord>, AccountApiError> {
    if let Ok(BackendError { error }) = serde_json::from_str::<BackendError>(body) {
        if error.ends_with("does not exist") {
            return Ok(None);
        }
        return Err(AccountApiError::Backend(error));
    }
    let success: BackendSuccess = serde_json::from_str(body)
        .map_err(|e| AccountApiError::InvalidResponse(e.to_string()))?;
    Ok(Some(record_from_success(success)))
}

/// The account backend as the custody wallet sees it.
#[async_trait]
pub trait AccountBackend: Send + Sync {
    /// Look up the account registered for a public key; `None` when the
    /// account does not exist yet.
    async fn get_account_info(
        &self,
        public_key: &str,
    ) -> Result<Option<AccountRecord>, AccountApiError>;

    /// Register the public key and create its on-chain account.
    async fn create_account(
        &self,
        public_key: &str,
        hash_algorithm: HashAlgorithm,
    ) -> Result<AccountRecord, AccountApiError>;
}

/// HTTP client for the account backend.
#[derive(Debug, Clone)]
pub struct AccountApi {
    base_url: Url,
    client: reqwest::Client,
}

#[async_trait]
impl AccountBackend for AccountApi {
    async fn get_account_info(
        &self,
        public_key: &str,
    ) -> Result<Option<AccountRecord>, AccountApiError> {
        AccountApi::get_account_info(self, public_key).await
    }

    async fn create_account(
        &self,
        public_key: &str,
        hash_algorithm: HashAlgorithm,
    ) -> Result<AccountRecord, AccountApiError> {
        AccountApi::create_account(self, public_key, hash_algorithm).await
    }
}

impl AccountApi {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
            key: "account_api_url".to_string(),
            source,
        })?;
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    fn accounts_url(&self) -> Result<Url, AccountApiError> {
        self.base_url
            .join("accounts")
            .map_err(|e| AccountApiError::InvalidResponse(e.to_string()))
    }

    /// Look up the account registered for a public key.
    pub async fn get_account_info(
        &self,
        public_key: &str,
    ) -> Result<Option<AccountRecord>, AccountApiError> {
        let mut url = self.accounts_url()?;
        url.query_pairs_mut().append_pair("publicKey", public_key);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // The backend answers both 200 and 404 with a parseable body; the
        // missing-account error shape is valid in either.
        if status.is_success() || status.as_u16() == 404 {
            return parse_lookup_body(&body);
        }
        Err(AccountApiError::Http {
            method: "GET",
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Register the public key and create its on-chain account.
    pub async fn create_account(
        &self,
        public_key: &str,
        hash_algorithm: HashAlgorithm,
    ) -> Result<AccountRecord, AccountApiError> {
        let url = self.accounts_url()?;
        let response = self
            .client
            .post(url.clone())
            .json(&CreateAccountBody {
                public_key,
                signature_algorithm: SIGNATURE_ALGORITHM,
                hash_algorithm: hash_algorithm.backend_label(),
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AccountApiError::Http {
                method: "POST",
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let success: BackendSuccess = serde_json::from_str(&body)
            .map_err(|e| AccountApiError::InvalidResponse(e.to_string()))?;
        Ok(record_from_success(success))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_account_maps_to_none() {
        let body = r#"{"error":"account with public key abc does not exist"}"#;
        assert!(parse_lookup_body(body).unwrap().is_none());
    }

    #[test]
    fn other_backend_errors_propagate() {
        let body = r#"{"error":"rate limited"}"#;
        let err = parse_lookup_body(body).unwrap_err();
        assert!(matches!(err, AccountApiError::Backend(ref e) if e == "rate limited"));
    }

    #[test]
    fn success_body_normalizes_address() {
        let body = r#"{
            "address": "f8d6e0586b0a20c7",
            "creationTxId": "tx1",
            "publicKeys": [
                {"publicKey": "aabb", "signatureAlgorithm": "ECDSA_secp256k1", "hashAlgorithm": "SHA2_256"}
            ]
        }"#;
        let record = parse_lookup_body(body).unwrap().unwrap();
        assert_eq!(record.address, "0xf8d6e0586b0a20c7");
        assert_eq!(record.key_index_of("aabb"), Some(0));
        assert_eq!(record.key_index_of("ccdd"), None);
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        assert!(matches!(
            parse_lookup_body("<html>504</html>"),
            Err(AccountApiError::InvalidResponse(_))
        ));
    }
}
