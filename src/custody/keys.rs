//! Key material for the custody signer.
//!
//! The login connection yields per-user entropy; the signing keypair is
//! derived from it deterministically so the same social login always maps to
//! the same chain account. Signatures are 64-byte r||s hex, low-s normalized,
//! over a SHA2-256 or SHA3-256 digest of the hex-decoded message.

use hkdf::Hkdf;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;

use crate::error::{ConfigError, CustodyError};

/// Derivation path bound into key expansion, so deployments deriving from
/// the same entropy for different purposes stay domain-separated.
pub const DERIVATION_PATH: &str = "m/44'/539'/0'/0/0";

/// Digest applied to messages before ECDSA signing.
///
/// The chain accepts accounts registered with either; the account backend
/// registration and the signer must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha3_256,
}

impl HashAlgorithm {
    pub(crate) fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "sha2_256" | "sha2" => Ok(Self::Sha2_256),
            "sha3_256" | "sha3" => Ok(Self::Sha3_256),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'SHA2_256' or 'SHA3_256', got '{value}'"),
            }),
        }
    }

    /// The identifier the account backend expects at registration.
    pub fn backend_label(self) -> &'static str {
        match self {
            Self::Sha2_256 => "SHA2_256",
            Self::Sha3_256 => "SHA3_256",
        }
    }
}

/// Hash a hex-encoded message for signing.
pub fn hash_message_hex(
    message_hex: &str,
    algorithm: HashAlgorithm,
) -> Result<[u8; 32], CustodyError> {
    let bytes = hex::decode(message_hex)
        .map_err(|e| CustodyError::Signing(format!("message is not valid hex: {e}")))?;
    let digest: [u8; 32] = match algorithm {
        HashAlgorithm::Sha2_256 => Sha256::digest(&bytes).into(),
        HashAlgorithm::Sha3_256 => Sha3_256::digest(&bytes).into(),
    };
    Ok(digest)
}

/// A secp256k1 signing keypair held in memory for the custody session.
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Derive the session keypair from hex-encoded login entropy.
    ///
    /// HKDF-SHA256 expansion with the derivation path as salt; the counter
    /// byte retries the negligible case of an out-of-range scalar.
    pub fn derive(entropy_hex: &SecretString) -> Result<Self, CustodyError> {
        let seed = hex::decode(entropy_hex.expose_secret())
            .map_err(|e| CustodyError::KeyDerivation(format!("entropy is not valid hex: {e}")))?;
        if seed.is_empty() {
            return Err(CustodyError::KeyDerivation("entropy is empty".to_string()));
        }

        let hk = Hkdf::<Sha256>::new(Some(DERIVATION_PATH.as_bytes()), &seed);
        for counter in 0u8..=255 {
            let mut okm = [0u8; 32];
            let info = [&b"secp256k1-signing-key"[..], &[counter]].concat();
            hk.expand(&info, &mut okm)
                .map_err(|e| CustodyError::KeyDerivation(e.to_string()))?;
            if let Ok(signing_key) = SigningKey::from_slice(&okm) {
                let point = signing_key.verifying_key().to_encoded_point(false);
                // Uncompressed SEC1 bytes, sans the 0x04 prefix.
                let public_key = hex::encode(&point.as_bytes()[1..]);
                return Ok(Self {
                    signing_key,
                    public_key,
                });
            }
        }
        Err(CustodyError::KeyDerivation(
            "no valid scalar in expansion range".to_string(),
        ))
    }

    /// Uncompressed public key hex, without the SEC1 `04` prefix, as the
    /// account backend expects it.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Sign a hex-encoded message: hash, ECDSA, r||s hex.
    pub fn sign_message_hex(
        &self,
        message_hex: &str,
        algorithm: HashAlgorithm,
    ) -> Result<String, CustodyError> {
        let digest = hash_message_hex(message_hex, algorithm)?;
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| CustodyError::Signing(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(hex::encode(signature.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entropy(fill: &str) -> SecretString {
        SecretString::from(fill.repeat(32))
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyPair::derive(&entropy("ab")).unwrap();
        let b = KeyPair::derive(&entropy("ab")).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn different_entropy_yields_different_keys() {
        let a = KeyPair::derive(&entropy("ab")).unwrap();
        let b = KeyPair::derive(&entropy("cd")).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn public_key_is_uncompressed_sans_prefix() {
        let keypair = KeyPair::derive(&entropy("ab")).unwrap();
        // 64 bytes (x || y) as hex.
        assert_eq!(keypair.public_key().len(), 128);
    }

    #[test]
    fn signatures_are_64_byte_hex() {
        let keypair = KeyPair::derive(&entropy("ab")).unwrap();
        let sig = keypair
            .sign_message_hex("deadbeef", HashAlgorithm::Sha2_256)
            .unwrap();
        assert_eq!(sig.len(), 128);
        assert!(hex::decode(&sig).is_ok());
    }

    #[test]
    fn digest_choice_changes_signature() {
        let keypair = KeyPair::derive(&entropy("ab")).unwrap();
        let sha2 = keypair
            .sign_message_hex("deadbeef", HashAlgorithm::Sha2_256)
            .unwrap();
        let sha3 = keypair
            .sign_message_hex("deadbeef", HashAlgorithm::Sha3_256)
            .unwrap();
        assert_ne!(sha2, sha3);
    }

    #[test]
    fn rejects_non_hex_input() {
        assert!(KeyPair::derive(&SecretString::from("not hex".to_string())).is_err());
        let keypair = KeyPair::derive(&entropy("ab")).unwrap();
        assert!(
            keypair
                .sign_message_hex("zz", HashAlgorithm::Sha2_256)
                .is_err()
        );
    }

    #[test]
    fn hash_algorithm_parse() {
        assert_eq!(
            HashAlgorithm::parse("SHA2_256", "HASH").unwrap(),
            HashAlgorithm::Sha2_256
        );
        assert_eq!(
            HashAlgorithm::parse("sha3-256", "HASH").unwrap(),
            HashAlgorithm::Sha3_256
        );
        assert!(HashAlgorithm::parse("md5", "HASH").is_err());
    }
}
