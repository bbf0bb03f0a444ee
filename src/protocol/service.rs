//! Service descriptor construction.
//!
//! Service descriptors are derived per-response and never stored. The `uid`
//! is deterministic so the dapp-side library can address the same service on
//! subsequent calls, and so inbound initiations carrying a uid can be told
//! apart from unrelated wallets sharing the channel.

use crate::protocol::objects::{
    AccountProofData, CompositeSignature, Identity, OBJECT_VERSION, Service, ServiceMethod,
    ServiceProvider, ServiceType,
};

/// Derive the stable uid advertised for one of this wallet's services.
pub fn derive_service_uid(app_id: &str, service_type: ServiceType) -> String {
    format!("{app_id}#{service_type}")
}

/// The variant-specific parts of a service descriptor.
#[derive(Debug, Clone)]
pub enum ServiceKind {
    /// Carries the wallet's provider metadata.
    Authn { provider: ServiceProvider },
    Authz,
    UserSignature,
    /// A pure-data service holding the signed proof of account ownership.
    AccountProof {
        nonce: String,
        signatures: Vec<CompositeSignature>,
    },
}

impl ServiceKind {
    fn service_type(&self) -> ServiceType {
        match self {
            Self::Authn { .. } => ServiceType::Authn,
            Self::Authz => ServiceType::Authz,
            Self::UserSignature => ServiceType::UserSignature,
            Self::AccountProof { .. } => ServiceType::AccountProof,
        }
    }
}

/// Build one service descriptor.
pub fn service_definition(
    app_id: &str,
    endpoint: &str,
    user_address: &str,
    key_id: u32,
    kind: ServiceKind,
) -> Service {
    let service_type = kind.service_type();
    let mut service = Service {
        f_type: "Service",
        f_vsn: OBJECT_VERSION,
        service_type,
        uid: derive_service_uid(app_id, service_type),
        endpoint: endpoint.to_string(),
        method: ServiceMethod::ExtRpc,
        id: user_address.to_string(),
        identity: Identity::new(user_address, key_id),
        provider: None,
        data: None,
    };
    match kind {
        ServiceKind::Authn { provider } => {
            service.provider = Some(provider);
        }
        ServiceKind::Authz | ServiceKind::UserSignature => {}
        ServiceKind::AccountProof { nonce, signatures } => {
            service.method = ServiceMethod::Data;
            service.data = Some(AccountProofData::new(user_address, nonce, signatures));
        }
    }
    service
}
