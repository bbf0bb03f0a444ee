//! Configuration for the wallet provider.
//!
//! Settings are resolved with priority: env var > explicit value > default.
//! `load_env()` pulls in a local `.env` early in startup; everything else
//! comes from the embedding application through `ProviderConfig`.

use serde::{Deserialize, Serialize};

use crate::custody::keys::HashAlgorithm;
use crate::error::ConfigError;
use crate::protocol::objects::ServiceProvider;

/// Load env vars from `./.env` (in addition to the process environment).
///
/// dotenvy never overwrites existing env vars, so explicit env vars keep
/// priority over the file.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which chain network the provider targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub(crate) fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'mainnet' or 'testnet', got '{value}'"),
            }),
        }
    }

    /// Default base URL of the account-creation backend for this network.
    pub fn default_account_api_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://hardware-wallet-api-mainnet.onflow.org",
            Self::Testnet => "https://hardware-wallet-api-testnet.staging.onflow.org",
        }
    }
}

/// One OAuth login provider the custody backend can authenticate through.
///
/// `id` doubles as the service endpoint advertised to the dapp, so an
/// initiation message's endpoint tells the wallet which provider to log in
/// with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginProviderMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub website: String,
}

impl LoginProviderMetadata {
    /// Render the provider metadata into the wire object attached to authn
    /// services.
    pub fn to_service_provider(&self, wallet_address: &str) -> ServiceProvider {
        let mut provider = ServiceProvider::new(wallet_address);
        provider.name = Some(self.name.clone());
        provider.description = Some(self.description.clone());
        provider.icon = Some(self.icon.clone());
        provider.website = Some(self.website.clone());
        provider
    }
}

/// The login providers shipped by default.
pub fn builtin_login_providers() -> Vec<LoginProviderMetadata> {
    [
        ("google", "Google"),
        ("facebook", "Facebook"),
        ("twitter", "Twitter"),
        ("discord", "Discord"),
    ]
    .into_iter()
    .map(|(id, name)| LoginProviderMetadata {
        id: id.to_string(),
        name: format!("Flowgate ({name})"),
        description: format!("Log in to Flow with your {name} account"),
        icon: format!("https://flowgate.io/icons/{id}.svg"),
        website: "https://flowgate.io".to_string(),
    })
    .collect()
}

/// Main configuration for the wallet provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub network: Network,
    /// Stable application identifier, used to derive service uids.
    pub app_id: String,
    /// The wallet's own chain address, advertised in provider metadata.
    pub wallet_address: String,
    pub account_api_url: String,
    pub hash_algorithm: HashAlgorithm,
    pub login_providers: Vec<LoginProviderMetadata>,
}

impl ProviderConfig {
    /// Build a configuration, applying env overrides on top of defaults.
    ///
    /// Recognized vars: `FLOWGATE_NETWORK`, `FLOWGATE_ACCOUNT_API_URL`,
    /// `FLOWGATE_HASH_ALGORITHM`.
    pub fn resolve(
        app_id: impl Into<String>,
        wallet_address: impl Into<String>,
        network: Network,
    ) -> Result<Self, ConfigError> {
        let network = match optional_env("FLOWGATE_NETWORK") {
            Some(value) => Network::parse(&value, "FLOWGATE_NETWORK")?,
            None => network,
        };

        let account_api_url = optional_env("FLOWGATE_ACCOUNT_API_URL")
            .unwrap_or_else(|| network.default_account_api_url().to_string());

        let hash_algorithm = match optional_env("FLOWGATE_HASH_ALGORITHM") {
            Some(value) => HashAlgorithm::parse(&value, "FLOWGATE_HASH_ALGORITHM")?,
            None => HashAlgorithm::Sha2_256,
        };

        Ok(Self {
            network,
            app_id: app_id.into(),
            wallet_address: wallet_address.into(),
            account_api_url,
            hash_algorithm,
            login_providers: builtin_login_providers(),
        })
    }

    /// Restrict the advertised login providers to a whitelist.
    pub fn with_login_providers(mut self, ids: &[&str]) -> Result<Self, ConfigError> {
        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            let provider = self
                .login_providers
                .iter()
                .find(|p| p.id == *id)
                .cloned()
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "login_providers".to_string(),
                    message: format!("{id} is not among available login providers"),
                })?;
            selected.push(provider);
        }
        self.login_providers = selected;
        Ok(self)
    }

    /// The provider a service endpoint addresses, if configured.
    pub fn login_provider(&self, endpoint: &str) -> Option<&LoginProviderMetadata> {
        self.login_providers.iter().find(|p| p.id == endpoint)
    }
}
