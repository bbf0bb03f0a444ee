//! Canonical message encodings for signing.
//!
//! The chain signs domain-tagged RLP forms: a 32-byte right-padded tag
//! followed by the RLP encoding of the payload. Signatures computed by the
//! custody signer are over these exact byte strings, so the encodings here
//! must match the client library's canonical forms byte for byte.

use serde_json::Value;

use crate::error::EncodeError;
use crate::protocol::objects::Signable;

pub const TRANSACTION_DOMAIN_TAG: &str = "FLOW-V0.0-transaction";
pub const USER_MESSAGE_DOMAIN_TAG: &str = "FLOW-V0.0-user";
pub const ACCOUNT_PROOF_DOMAIN_TAG: &str = "FCL-ACCOUNT-PROOF-V0.0";

/// Chain addresses are 8 bytes on the wire.
const ADDRESS_LEN: usize = 8;

/// Reference block ids are 32 bytes on the wire.
const BLOCK_ID_LEN: usize = 32;

/// An RLP item: either a byte string or a list of items.
#[derive(Debug, Clone)]
pub enum Rlp {
    Bytes(Vec<u8>),
    List(Vec<Rlp>),
}

impl Rlp {
    pub fn string(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }

    /// Minimal big-endian integer encoding; zero is the empty byte string.
    pub fn uint(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self::Bytes(bytes[start..].to_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => {
                if bytes.len() == 1 && bytes[0] < 0x80 {
                    bytes.clone()
                } else {
                    let mut out = encode_length(bytes.len(), 0x80);
                    out.extend_from_slice(bytes);
                    out
                }
            }
            Self::List(items) => {
                let payload: Vec<u8> = items.iter().flat_map(Rlp::encode).collect();
                let mut out = encode_length(payload.len(), 0xc0);
                out.extend_from_slice(&payload);
                out
            }
        }
    }
}

fn encode_length(len: usize, offset: u8) -> Vec<u8> {
    if len <= 55 {
        vec![offset + len as u8]
    } else {
        let len_bytes = len.to_be_bytes();
        let start = len_bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(len_bytes.len());
        let mut out = vec![offset + 55 + (len_bytes.len() - start) as u8];
        out.extend_from_slice(&len_bytes[start..]);
        out
    }
}

/// A domain tag as the chain expects it: UTF-8 bytes right-padded with
/// zeros to 32 bytes.
pub fn padded_domain_tag(tag: &str) -> [u8; 32] {
    let bytes = tag.as_bytes();
    assert!(bytes.len() <= 32, "domain tag longer than 32 bytes: {tag}");
    let mut padded = [0u8; 32];
    padded[..bytes.len()].copy_from_slice(bytes);
    padded
}

/// Strip a leading `0x` from an address or hex string.
pub fn sans_hex_prefix(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

/// Normalize an address to its `0x`-prefixed form.
pub fn with_hex_prefix(value: &str) -> String {
    format!("0x{}", sans_hex_prefix(value))
}

fn left_padded_hex(value: &str, len: usize, field: &'static str) -> Result<Vec<u8>, EncodeError> {
    let stripped = sans_hex_prefix(value);
    let decoded = hex::decode(stripped).map_err(|e| EncodeError::InvalidHex {
        field,
        message: e.to_string(),
    })?;
    if decoded.len() > len {
        return Err(EncodeError::InvalidHex {
            field,
            message: format!("expected at most {len} bytes, got {}", decoded.len()),
        });
    }
    let mut padded = vec![0u8; len - decoded.len()];
    padded.extend_from_slice(&decoded);
    Ok(padded)
}

fn address_bytes(address: &str) -> Result<Vec<u8>, EncodeError> {
    left_padded_hex(address, ADDRESS_LEN, "address")
        .map_err(|_| EncodeError::InvalidAddress(address.to_string()))
}

/// Prefix a hex-encoded user message with the user-message domain tag.
pub fn add_user_domain_tag(message_hex: &str) -> String {
    let tag_hex = hex::encode(padded_domain_tag(USER_MESSAGE_DOMAIN_TAG));
    format!("{tag_hex}{message_hex}")
}

/// The canonical account-proof message: domain tag followed by
/// RLP([app identifier, address, nonce]). Returned hex encoded, ready for
/// the custody signer.
pub fn encode_account_proof(
    app_identifier: &str,
    address: &str,
    nonce: &str,
) -> Result<String, EncodeError> {
    let nonce_bytes = hex::decode(sans_hex_prefix(nonce)).map_err(|e| EncodeError::InvalidHex {
        field: "nonce",
        message: e.to_string(),
    })?;
    let rlp = Rlp::List(vec![
        Rlp::string(app_identifier),
        Rlp::Bytes(address_bytes(address)?),
        Rlp::Bytes(nonce_bytes),
    ])
    .encode();

    let mut message = padded_domain_tag(ACCOUNT_PROOF_DOMAIN_TAG).to_vec();
    message.extend_from_slice(&rlp);
    Ok(hex::encode(message))
}

/// The canonical transaction message for a signable, hex encoded.
///
/// The payer signs the envelope form (payload wrapped with any payload
/// signatures); every other signer signs the payload form. The inbound wire
/// shape carries no payload signatures, so the envelope wraps an empty list.
pub fn encode_transaction_signable(
    signable: &Signable,
    signer_address: &str,
) -> Result<String, EncodeError> {
    let voucher = &signable.voucher;

    let arguments = voucher
        .arguments
        .iter()
        .map(argument_bytes)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(Rlp::Bytes)
        .collect();

    let authorizers = voucher
        .authorizers
        .iter()
        .map(|addr| address_bytes(addr).map(Rlp::Bytes))
        .collect::<Result<Vec<_>, _>>()?;

    let payload = Rlp::List(vec![
        Rlp::string(&voucher.cadence),
        Rlp::List(arguments),
        Rlp::Bytes(left_padded_hex(
            &voucher.ref_block,
            BLOCK_ID_LEN,
            "refBlock",
        )?),
        Rlp::uint(voucher.compute_limit),
        Rlp::Bytes(address_bytes(&voucher.proposal_key.address)?),
        Rlp::uint(u64::from(voucher.proposal_key.key_id)),
        Rlp::uint(voucher.proposal_key.sequence_num),
        Rlp::Bytes(address_bytes(&voucher.payer)?),
        Rlp::List(authorizers),
    ]);

    let is_payer = sans_hex_prefix(signer_address) == sans_hex_prefix(&voucher.payer);
    let rlp = if is_payer {
        Rlp::List(vec![payload, Rlp::List(vec![])]).encode()
    } else {
        payload.encode()
    };

    let mut message = padded_domain_tag(TRANSACTION_DOMAIN_TAG).to_vec();
    message.extend_from_slice(&rlp);
    Ok(hex::encode(message))
}

fn argument_bytes(argument: &Value) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(argument)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rlp_known_vectors() {
        assert_eq!(Rlp::string("dog").encode(), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(Rlp::string("").encode(), vec![0x80]);
        assert_eq!(Rlp::Bytes(vec![0x01]).encode(), vec![0x01]);
        assert_eq!(Rlp::uint(0).encode(), vec![0x80]);
        assert_eq!(Rlp::uint(1024).encode(), vec![0x82, 0x04, 0x00]);
        assert_eq!(
            Rlp::List(vec![Rlp::string("cat"), Rlp::string("dog")]).encode(),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        assert_eq!(Rlp::List(vec![]).encode(), vec![0xc0]);
    }

    #[test]
    fn rlp_long_string_uses_length_of_length() {
        let long = "a".repeat(56);
        let encoded = Rlp::string(&long).encode();
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 56);
        assert_eq!(encoded.len(), 58);
    }

    #[test]
    fn domain_tags_pad_to_32_bytes() {
        let tag = padded_domain_tag(TRANSACTION_DOMAIN_TAG);
        assert_eq!(tag.len(), 32);
        assert!(tag.starts_with(TRANSACTION_DOMAIN_TAG.as_bytes()));
        assert_eq!(tag[TRANSACTION_DOMAIN_TAG.len()..], [0u8; 11]);
    }

    #[test]
    fn user_domain_tag_prefixes_message() {
        let tagged = add_user_domain_tag("deadbeef");
        assert_eq!(tagged.len(), 64 + 8);
        assert!(tagged.ends_with("deadbeef"));
        assert!(tagged.starts_with(&hex::encode("FLOW-V0.0-user")));
    }

    #[test]
    fn account_proof_encoding_is_deterministic_and_nonce_sensitive() {
        let a = encode_account_proof("Awesome App (v0.0)", "0xf8d6e0586b0a20c7", "aa".repeat(32).as_str())
            .unwrap();
        let b = encode_account_proof("Awesome App (v0.0)", "0xf8d6e0586b0a20c7", "aa".repeat(32).as_str())
            .unwrap();
        let c = encode_account_proof("Awesome App (v0.0)", "0xf8d6e0586b0a20c7", "bb".repeat(32).as_str())
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(&hex::encode(padded_domain_tag(ACCOUNT_PROOF_DOMAIN_TAG))));
    }

    #[test]
    fn account_proof_rejects_bad_nonce() {
        let err = encode_account_proof("app", "0x01", "not-hex").unwrap_err();
        assert!(err.to_string().contains("nonce"));
    }

    fn sample_signable(payer: &str) -> Signable {
        serde_json::from_value(json!({
            "f_type": "Signable",
            "f_vsn": "1.0.1",
            "voucher": {
                "cadence": "transaction { prepare(acct: &Account) {} }",
                "refBlock": "01".repeat(32),
                "computeLimit": 999,
                "arguments": [{"type": "String", "value": "hi"}],
                "proposalKey": {"address": "0x01", "keyId": 2, "sequenceNum": 3},
                "payer": payer,
                "authorizers": ["0x01"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn payer_signs_envelope_form() {
        let signable = sample_signable("0x02");
        let as_payer = encode_transaction_signable(&signable, "0x02").unwrap();
        let as_authorizer = encode_transaction_signable(&signable, "0x01").unwrap();
        assert_ne!(as_payer, as_authorizer);
        // Both carry the transaction domain tag.
        let tag = hex::encode(padded_domain_tag(TRANSACTION_DOMAIN_TAG));
        assert!(as_payer.starts_with(&tag));
        assert!(as_authorizer.starts_with(&tag));
    }

    #[test]
    fn prefix_helpers_normalize() {
        assert_eq!(sans_hex_prefix("0xabc"), "abc");
        assert_eq!(sans_hex_prefix("abc"), "abc");
        assert_eq!(with_hex_prefix("abc"), "0xabc");
        assert_eq!(with_hex_prefix("0xabc"), "0xabc");
    }
}
