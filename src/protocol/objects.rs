//! FCL wire objects.
//!
//! Every response back to the dapp's client library is wrapped in a
//! `PollingResponse`. Nested objects each carry their own `f_type`/`f_vsn`
//! pair; the general object version and the Signable version are distinct
//! constants and must never be conflated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version tag stamped on general protocol objects.
pub const OBJECT_VERSION: &str = "1.0.0";

/// Version tag carried by `Signable` payloads (and only those).
pub const SIGNABLE_VERSION: &str = "1.0.1";

/// Version tag carried by account-proof data objects.
pub const ACCOUNT_PROOF_VERSION: &str = "2.0.0";

/// Outbound acknowledgement that a service view is ready.
pub const VIEW_READY: &str = "FCL:VIEW:READY";

/// Inbound message type carrying an exchange's request body.
pub const VIEW_READY_RESPONSE: &str = "FCL:VIEW:READY:RESPONSE";

/// Outbound message type wrapping a polling response.
pub const VIEW_RESPONSE: &str = "FCL:VIEW:RESPONSE";

/// The service capabilities this wallet can advertise or resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "authn")]
    Authn,
    #[serde(rename = "authz")]
    Authz,
    #[serde(rename = "user-signature")]
    UserSignature,
    #[serde(rename = "account-proof")]
    AccountProof,
}

impl ServiceType {
    /// Parse a declared service type tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "authn" => Some(Self::Authn),
            "authz" => Some(Self::Authz),
            "user-signature" => Some(Self::UserSignature),
            "account-proof" => Some(Self::AccountProof),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Authn => "authn",
            Self::Authz => "authz",
            Self::UserSignature => "user-signature",
            Self::AccountProof => "account-proof",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// How the dapp should reach a service. `Data` means the `Service` object
/// itself is the payload and no further communication happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceMethod {
    #[serde(rename = "EXT/RPC")]
    ExtRpc,
    #[serde(rename = "DATA")]
    Data,
}

/// Status of a polling response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "DECLINED")]
    Declined,
}

/// The identity of the signing user.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    f_type: &'static str,
    f_vsn: &'static str,
    pub address: String,
    #[serde(rename = "keyId")]
    pub key_id: u32,
}

impl Identity {
    pub fn new(address: impl Into<String>, key_id: u32) -> Self {
        Self {
            f_type: "Identity",
            f_vsn: OBJECT_VERSION,
            address: address.into(),
            key_id,
        }
    }
}

/// Information about the wallet itself, attached to authn services.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceProvider {
    f_type: &'static str,
    f_vsn: &'static str,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ServiceProvider {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            f_type: "ServiceProvider",
            f_vsn: OBJECT_VERSION,
            address: address.into(),
            name: None,
            description: None,
            icon: None,
            website: None,
        }
    }
}

/// A single composite signature as the chain expects it.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeSignature {
    f_type: &'static str,
    f_vsn: &'static str,
    pub addr: String,
    #[serde(rename = "keyId")]
    pub key_id: u32,
    pub signature: String,
}

impl CompositeSignature {
    pub fn new(addr: impl Into<String>, key_id: u32, signature: impl Into<String>) -> Self {
        Self {
            f_type: "CompositeSignature",
            f_vsn: OBJECT_VERSION,
            addr: addr.into(),
            key_id,
            signature: signature.into(),
        }
    }
}

/// Account-proof payload attached as `data` to the DATA service in an
/// authn response.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProofData {
    f_type: &'static str,
    f_vsn: &'static str,
    pub address: String,
    pub nonce: String,
    pub signatures: Vec<CompositeSignature>,
}

impl AccountProofData {
    pub fn new(
        address: impl Into<String>,
        nonce: impl Into<String>,
        signatures: Vec<CompositeSignature>,
    ) -> Self {
        Self {
            f_type: "account-proof",
            f_vsn: ACCOUNT_PROOF_VERSION,
            address: address.into(),
            nonce: nonce.into(),
            signatures,
        }
    }
}

/// Advertisement of one capability this wallet offers.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub(crate) f_type: &'static str,
    pub(crate) f_vsn: &'static str,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub uid: String,
    pub endpoint: String,
    pub method: ServiceMethod,
    /// The wallet's internal identifier for the user (the account address).
    pub id: String,
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ServiceProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AccountProofData>,
}

/// Tells the dapp which services the wallet provides after authentication.
#[derive(Debug, Clone, Serialize)]
pub struct AuthnData {
    f_type: &'static str,
    f_vsn: &'static str,
    pub addr: String,
    pub services: Vec<Service>,
}

impl AuthnData {
    pub fn new(addr: impl Into<String>, services: Vec<Service>) -> Self {
        Self {
            f_type: "AuthnResponse",
            f_vsn: OBJECT_VERSION,
            addr: addr.into(),
            services,
        }
    }
}

/// The payload variants a polling response can carry.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Authn(AuthnData),
    Signature(CompositeSignature),
}

/// The outbound wire envelope.
///
/// `reason` is serialized even when absent (`null`) because the client
/// library distinguishes a missing field from an explicit null on approved
/// responses; `data` is omitted entirely when declined.
#[derive(Debug, Clone, Serialize)]
pub struct PollingResponse {
    #[serde(rename = "type")]
    pub(crate) message_type: &'static str,
    pub(crate) f_type: &'static str,
    pub(crate) f_vsn: &'static str,
    pub status: Status,
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

/// A transaction payload awaiting an authorization signature.
#[derive(Debug, Clone, Deserialize)]
pub struct Signable {
    #[serde(default)]
    pub f_type: String,
    #[serde(default)]
    pub f_vsn: String,
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(rename = "keyId", default)]
    pub key_id: Option<u32>,
    pub voucher: Voucher,
}

/// The transaction body carried inside a signable.
#[derive(Debug, Clone, Deserialize)]
pub struct Voucher {
    pub cadence: String,
    #[serde(rename = "refBlock")]
    pub ref_block: String,
    #[serde(rename = "computeLimit")]
    pub compute_limit: u64,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(rename = "proposalKey")]
    pub proposal_key: ProposalKey,
    pub payer: String,
    #[serde(default)]
    pub authorizers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalKey {
    pub address: String,
    #[serde(rename = "keyId")]
    pub key_id: u32,
    #[serde(rename = "sequenceNum")]
    pub sequence_num: u64,
}

/// Request for a proof of account ownership, sent alongside authn.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountProofRequest {
    #[serde(rename = "appIdentifier")]
    pub app_identifier: String,
    /// Minimum 32-byte random nonce as a hex string.
    pub nonce: String,
}

/// Request to sign an arbitrary user message (hex encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct UserMessageRequest {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_signature_uses_wire_field_names() {
        let sig = CompositeSignature::new("0x1", 3, "abcd");
        let value = serde_json::to_value(&sig).unwrap();
        assert_eq!(value["f_type"], "CompositeSignature");
        assert_eq!(value["f_vsn"], OBJECT_VERSION);
        assert_eq!(value["keyId"], 3);
        assert!(value.get("key_id").is_none());
    }

    #[test]
    fn account_proof_data_carries_its_own_version() {
        let proof = AccountProofData::new("0x1", "aa", vec![]);
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["f_vsn"], ACCOUNT_PROOF_VERSION);
        assert_eq!(value["f_type"], "account-proof");
    }

    #[test]
    fn service_type_tags_round_trip() {
        for tag in ["authn", "authz", "user-signature", "account-proof"] {
            let parsed = ServiceType::from_tag(tag).unwrap();
            assert_eq!(parsed.as_tag(), tag);
        }
        assert!(ServiceType::from_tag("pre-authz").is_none());
    }

    #[test]
    fn signable_parses_wire_shape() {
        let raw = serde_json::json!({
            "f_type": "Signable",
            "f_vsn": SIGNABLE_VERSION,
            "addr": "0xf8d6e0586b0a20c7",
            "keyId": 0,
            "voucher": {
                "cadence": "transaction {}",
                "refBlock": "aa".repeat(32),
                "computeLimit": 100,
                "arguments": [],
                "proposalKey": {
                    "address": "0xf8d6e0586b0a20c7",
                    "keyId": 0,
                    "sequenceNum": 7
                },
                "payer": "0xf8d6e0586b0a20c7",
                "authorizers": ["0xf8d6e0586b0a20c7"]
            }
        });
        let signable: Signable = serde_json::from_value(raw).unwrap();
        assert_eq!(signable.voucher.proposal_key.sequence_num, 7);
        assert_eq!(signable.voucher.authorizers.len(), 1);
    }
}
