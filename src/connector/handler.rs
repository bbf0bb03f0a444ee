//! The connector protocol handler.
//!
//! Consumes classified inbound messages, advances the exchange state
//! machine, awaits the signing oracle where a resolution calls for it, and
//! produces at most one wire response per message. Collaborator failures
//! are caught here; nothing escapes to the transport.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ProviderConfig;
use crate::connector::envelope::{self, DECLINED_REASON};
use crate::connector::exchange::{Exchange, ExchangeState};
use crate::custody::{ConfirmationGate, SignRequest, SigningOracle};
use crate::protocol::classify::{
    ReadyResponse, ServiceInitiation, classify_initiation, classify_ready_response,
    parse_account_proof, parse_signable, parse_user_message,
};
use crate::protocol::encode::encode_transaction_signable;
use crate::protocol::objects::{
    AccountProofRequest, AuthnData, CompositeSignature, PollingResponse, ResponseData, Service,
    ServiceProvider, ServiceType,
};
use crate::protocol::service::{ServiceKind, derive_service_uid, service_definition};

/// The dapp-facing connector: one instance per message channel, owning its
/// own exchange state so concurrent connectors never cross-talk.
///
/// `handle_message` takes `&self`: a resolution suspends on the oracle, and
/// a competing initiation arriving meanwhile must be able to supersede the
/// exchange. The state lock is only ever held across a single transition,
/// never across an await, and the exchange record captured at resolution
/// start is compared by token before anything is emitted.
pub struct Connector {
    config: ProviderConfig,
    oracle: Arc<dyn SigningOracle>,
    gate: Arc<dyn ConfirmationGate>,
    state: Mutex<ExchangeState>,
}

impl Connector {
    pub fn new(
        config: ProviderConfig,
        oracle: Arc<dyn SigningOracle>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            config,
            oracle,
            gate,
            state: Mutex::new(ExchangeState::new()),
        }
    }

    /// Handle one inbound window message.
    ///
    /// Returns the message to post back, or `None` when the input is noise,
    /// foreign, out of correlation, or resolves without a wire response.
    pub async fn handle_message(&self, raw: &Value) -> Option<Value> {
        if let Some(initiation) = classify_initiation(raw) {
            return self.handle_initiation(&initiation).await;
        }
        if let Some(response) = classify_ready_response(raw) {
            return self.handle_ready_response(&response).await;
        }
        None
    }

    async fn handle_initiation(&self, initiation: &ServiceInitiation) -> Option<Value> {
        let mut state = self.state.lock().await;

        // An initiation addressed by uid to another wallet is foreign:
        // it clears any unresolved exchange and gets no acknowledgement.
        if let Some(uid) = &initiation.uid
            && !self.owns_uid(uid)
        {
            debug!(uid, "initiation addressed to a foreign service");
            state.reset();
            return None;
        }

        match state.apply_initiation(initiation) {
            Some(exchange) => {
                debug!(
                    service_type = %exchange.service_type,
                    endpoint = %exchange.endpoint,
                    "exchange established"
                );
                Some(envelope::ready_message())
            }
            None => {
                debug!(type_tag = %initiation.type_tag, "unsupported initiation type");
                None
            }
        }
    }

    fn owns_uid(&self, uid: &str) -> bool {
        [
            ServiceType::Authn,
            ServiceType::Authz,
            ServiceType::UserSignature,
            ServiceType::AccountProof,
        ]
        .iter()
        .any(|service_type| derive_service_uid(&self.config.app_id, *service_type) == uid)
    }

    async fn handle_ready_response(&self, response: &ReadyResponse) -> Option<Value> {
        let exchange = {
            let state = self.state.lock().await;
            match state.correlate(response) {
                Some(exchange) => exchange,
                None => {
                    debug!(
                        declared = response.declared_type.as_deref().unwrap_or("<none>"),
                        awaiting = ?state.awaiting(),
                        "uncorrelated ready-response ignored"
                    );
                    return None;
                }
            }
        };
        match exchange.service_type {
            ServiceType::Authn => self.resolve_authn(&exchange, response).await,
            ServiceType::Authz => self.resolve_authz(&exchange, response).await,
            ServiceType::UserSignature => self.resolve_user_signature(&exchange, response).await,
            ServiceType::AccountProof => {
                unreachable!("account-proof is advertised data, never an exchange")
            }
        }
    }

    /// Finish the captured exchange. False means it was superseded while a
    /// resolution was suspended, and its envelope must be suppressed.
    async fn finish(&self, exchange: &Exchange) -> bool {
        self.state.lock().await.complete(exchange)
    }

    async fn resolve_authn(
        &self,
        exchange: &Exchange,
        response: &ReadyResponse,
    ) -> Option<Value> {
        let identity = match self.oracle.login(&exchange.endpoint).await {
            Ok(identity) => identity,
            Err(err) => {
                // Abandoned without a wire response: a failed login must not
                // confirm this wallet's identity to the page. The embedding
                // application hears about it through the status callback.
                warn!(%err, endpoint = %exchange.endpoint, "login failed, abandoning exchange");
                self.finish(exchange).await;
                return None;
            }
        };

        // An account-proof request rides along in the authn body.
        let proof = response
            .body
            .as_ref()
            .and_then(|body| parse_account_proof(body));
        let proof_signature = match &proof {
            Some(proof) => match self.oracle.sign_account_proof(proof).await {
                Ok(signature) => Some(signature),
                Err(err) => {
                    warn!(%err, "account proof signing failed, abandoning exchange");
                    self.finish(exchange).await;
                    return None;
                }
            },
            None => None,
        };

        if !self.finish(exchange).await {
            debug!("authentication superseded mid-resolution, response suppressed");
            return None;
        }

        let services = self.authn_services(
            exchange,
            &identity.address,
            identity.key_index,
            proof,
            proof_signature,
        );
        info!(address = %identity.address, services = services.len(), "authentication approved");
        to_wire(envelope::approved(ResponseData::Authn(AuthnData::new(
            identity.address,
            services,
        ))))
    }

    fn authn_services(
        &self,
        exchange: &Exchange,
        address: &str,
        key_index: u32,
        proof: Option<AccountProofRequest>,
        proof_signature: Option<String>,
    ) -> Vec<Service> {
        let provider = match self.config.login_provider(&exchange.endpoint) {
            Some(metadata) => metadata.to_service_provider(&self.config.wallet_address),
            None => ServiceProvider::new(self.config.wallet_address.clone()),
        };

        let mut services = vec![
            self.service(exchange, address, key_index, ServiceKind::Authn { provider }),
            self.service(exchange, address, key_index, ServiceKind::Authz),
            self.service(exchange, address, key_index, ServiceKind::UserSignature),
        ];
        if let (Some(proof), Some(signature)) = (proof, proof_signature) {
            services.push(self.service(
                exchange,
                address,
                key_index,
                ServiceKind::AccountProof {
                    nonce: proof.nonce,
                    signatures: vec![CompositeSignature::new(address, key_index, signature)],
                },
            ));
        }
        services
    }

    fn service(
        &self,
        exchange: &Exchange,
        address: &str,
        key_index: u32,
        kind: ServiceKind,
    ) -> Service {
        service_definition(
            &self.config.app_id,
            &exchange.endpoint,
            address,
            key_index,
            kind,
        )
    }

    async fn resolve_authz(
        &self,
        exchange: &Exchange,
        response: &ReadyResponse,
    ) -> Option<Value> {
        // The dapp library sends ready-responses to the authz service that
        // carry no signable; only the one with the signable proceeds, the
        // rest are ignored without disturbing the exchange.
        let signable = response.body.as_ref().and_then(|body| parse_signable(body))?;

        let identity = self
            .oracle
            .account_identity()
            .await
            .expect("authorization exchange without an established account identity");

        let encoded = match encode_transaction_signable(&signable, &identity.address) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%err, "signable does not encode, ignoring");
                return None;
            }
        };

        let signature = if self
            .gate
            .confirm_sign(SignRequest::Transaction {
                signable: &signable,
            })
            .await
        {
            self.oracle.sign_tx_message(&encoded).await.map_err(|err| {
                warn!(%err, "transaction signing failed");
            })
        } else {
            Err(())
        };

        if !self.finish(exchange).await {
            debug!("authorization superseded mid-resolution, response suppressed");
            return None;
        }

        match signature {
            Ok(signature) => {
                info!(address = %identity.address, "authorization approved");
                to_wire(envelope::approved(ResponseData::Signature(
                    CompositeSignature::new(identity.address, identity.key_index, signature),
                )))
            }
            Err(()) => to_wire(envelope::declined(DECLINED_REASON)),
        }
    }

    async fn resolve_user_signature(
        &self,
        exchange: &Exchange,
        response: &ReadyResponse,
    ) -> Option<Value> {
        let request = response
            .body
            .as_ref()
            .and_then(|body| parse_user_message(body))?;

        let identity = self
            .oracle
            .account_identity()
            .await
            .expect("user-signature exchange without an established account identity");

        let signature = if self
            .gate
            .confirm_sign(SignRequest::Message {
                message_hex: &request.message,
            })
            .await
        {
            self.oracle
                .sign_user_message(&request.message)
                .await
                .map_err(|err| {
                    warn!(%err, "user message signing failed");
                })
        } else {
            Err(())
        };

        if !self.finish(exchange).await {
            debug!("user-signature superseded mid-resolution, response suppressed");
            return None;
        }

        match signature {
            Ok(signature) => {
                info!(address = %identity.address, "user signature approved");
                to_wire(envelope::approved(ResponseData::Signature(
                    CompositeSignature::new(identity.address, identity.key_index, signature),
                )))
            }
            Err(()) => to_wire(envelope::declined(DECLINED_REASON)),
        }
    }
}

fn to_wire(envelope: PollingResponse) -> Option<Value> {
    match serde_json::to_value(&envelope) {
        Ok(value) => Some(value),
        Err(err) => {
            error!(%err, "failed to serialize envelope");
            None
        }
    }
}
