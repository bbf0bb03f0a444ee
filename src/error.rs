//! Error types for flowgate.

/// Top-level error type for the wallet provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Account API error: {0}")]
    AccountApi(#[from] AccountApiError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid URL for {key}: {source}")]
    InvalidUrl {
        key: String,
        #[source]
        source: url::ParseError,
    },
}

/// Custody/signing errors.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("No active custody session")]
    NotLoggedIn,

    #[error("Login with provider {provider} failed: {reason}")]
    LoginFailed { provider: String, reason: String },

    #[error("Unknown login provider: {0}")]
    UnknownProvider(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Account API error: {0}")]
    AccountApi(#[from] AccountApiError),
}

/// Canonical message encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Invalid hex in {field}: {message}")]
    InvalidHex { field: &'static str, message: String },

    #[error("Invalid chain address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Account-creation backend errors.
#[derive(Debug, thiserror::Error)]
pub enum AccountApiError {
    #[error("{method} {url} returned {status}: {body}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Account backend error: {0}")]
    Backend(String),

    #[error("Invalid response from account backend: {0}")]
    InvalidResponse(String),

    #[error("Public key not registered on account {address}")]
    KeyNotRegistered { address: String },

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Message transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to post message on {port}: {reason}")]
    PostFailed { port: &'static str, reason: String },

    #[error("Message port closed")]
    Closed,
}

/// Result type alias for the wallet provider.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_custody_errors() {
        let err = Error::from(CustodyError::LoginFailed {
            provider: "google".to_string(),
            reason: "popup closed".to_string(),
        });
        assert!(err.to_string().contains("google"));
        assert!(err.to_string().contains("popup closed"));
    }

    #[test]
    fn account_api_http_error_carries_context() {
        let err = AccountApiError::Http {
            method: "POST",
            url: "https://accounts.example/accounts".to_string(),
            status: 500,
            body: "internal".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("POST"));
        assert!(rendered.contains("500"));
    }
}
