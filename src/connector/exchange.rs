//! Exchange correlation state.
//!
//! At most one exchange is in flight at any time. The record is
//! copy-on-write: transitions replace it wholesale, never mutate it in
//! place, so a resolution that captured the record at its start can tell
//! whether it has been superseded by comparing tokens at completion time.

use uuid::Uuid;

use crate::protocol::classify::{ReadyResponse, ServiceInitiation};
use crate::protocol::objects::ServiceType;

/// One in-flight authentication or signing exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub service_type: ServiceType,
    /// The endpoint the initiating service named; for this wallet's
    /// services it is the login provider id.
    pub endpoint: String,
    token: Uuid,
}

impl Exchange {
    fn new(service_type: ServiceType, endpoint: String) -> Self {
        Self {
            service_type,
            endpoint,
            token: Uuid::new_v4(),
        }
    }
}

/// The connector's single-exchange state machine.
#[derive(Debug, Default)]
pub struct ExchangeState {
    active: Option<Exchange>,
}

impl ExchangeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition on a service initiation message.
    ///
    /// A recognized exchange type replaces any unresolved exchange (dapp
    /// libraries re-announce) and returns the new record so the caller can
    /// acknowledge readiness. Anything else clears the state and returns
    /// `None`.
    pub fn apply_initiation(&mut self, initiation: &ServiceInitiation) -> Option<Exchange> {
        match ServiceType::from_tag(&initiation.type_tag) {
            Some(
                service_type @ (ServiceType::Authn
                | ServiceType::Authz
                | ServiceType::UserSignature),
            ) => {
                let exchange = Exchange::new(service_type, initiation.endpoint.clone());
                self.active = Some(exchange.clone());
                Some(exchange)
            }
            _ => {
                self.active = None;
                None
            }
        }
    }

    /// The exchange a ready-response correlates to.
    ///
    /// `None` either when no exchange is active or when the response's
    /// declared service type does not match the awaited one — the dapp
    /// library emits ready-responses for services it has not resolved yet,
    /// and those must be ignored without disturbing the state.
    pub fn correlate(&self, response: &ReadyResponse) -> Option<Exchange> {
        let active = self.active.as_ref()?;
        let declared = response.declared_type.as_deref()?;
        (declared == active.service_type.as_tag()).then(|| active.clone())
    }

    /// True while the given exchange is still the active one.
    pub fn is_current(&self, exchange: &Exchange) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.token == exchange.token)
    }

    /// Finish the exchange: clears the state and returns true if it was
    /// still current, leaves a superseding exchange untouched and returns
    /// false otherwise.
    pub fn complete(&mut self, exchange: &Exchange) -> bool {
        if self.is_current(exchange) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Drop any active exchange.
    pub fn reset(&mut self) {
        self.active = None;
    }

    pub fn awaiting(&self) -> Option<ServiceType> {
        self.active.as_ref().map(|active| active.service_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initiation(type_tag: &str, endpoint: &str) -> ServiceInitiation {
        ServiceInitiation {
            type_tag: type_tag.to_string(),
            endpoint: endpoint.to_string(),
            uid: None,
        }
    }

    fn ready_response(declared: Option<&str>) -> ReadyResponse {
        ReadyResponse {
            declared_type: declared.map(str::to_string),
            body: None,
        }
    }

    #[test]
    fn recognized_initiation_establishes_exchange() {
        let mut state = ExchangeState::new();
        let exchange = state.apply_initiation(&initiation("authn", "google")).unwrap();
        assert_eq!(exchange.service_type, ServiceType::Authn);
        assert_eq!(state.awaiting(), Some(ServiceType::Authn));
    }

    #[test]
    fn unrecognized_initiation_clears_state() {
        let mut state = ExchangeState::new();
        state.apply_initiation(&initiation("authn", "google"));
        assert!(state.apply_initiation(&initiation("pre-authz", "google")).is_none());
        assert_eq!(state.awaiting(), None);

        // account-proof is advertised but never an exchange type.
        assert!(state.apply_initiation(&initiation("account-proof", "google")).is_none());
        assert!(state.apply_initiation(&initiation("", "google")).is_none());
    }

    #[test]
    fn later_initiations_supersede() {
        let mut state = ExchangeState::new();
        let first = state.apply_initiation(&initiation("authn", "google")).unwrap();
        let second = state.apply_initiation(&initiation("authz", "discord")).unwrap();
        assert!(!state.is_current(&first));
        assert!(state.is_current(&second));
        assert_eq!(state.awaiting(), Some(ServiceType::Authz));
    }

    #[test]
    fn correlate_requires_matching_declared_type() {
        let mut state = ExchangeState::new();
        state.apply_initiation(&initiation("authz", "google"));

        assert!(state.correlate(&ready_response(Some("authn"))).is_none());
        assert!(state.correlate(&ready_response(None)).is_none());
        // Ignoring a non-matching response leaves the awaited type unchanged.
        assert_eq!(state.awaiting(), Some(ServiceType::Authz));

        let matched = state.correlate(&ready_response(Some("authz"))).unwrap();
        assert_eq!(matched.service_type, ServiceType::Authz);
    }

    #[test]
    fn correlate_when_idle_matches_nothing() {
        let state = ExchangeState::new();
        assert!(state.correlate(&ready_response(Some("authn"))).is_none());
    }

    #[test]
    fn complete_is_exactly_once_and_supersession_aware() {
        let mut state = ExchangeState::new();
        let exchange = state.apply_initiation(&initiation("authn", "google")).unwrap();
        assert!(state.complete(&exchange));
        assert!(!state.complete(&exchange));
        assert_eq!(state.awaiting(), None);

        // A superseded exchange must not clobber its replacement.
        let stale = state.apply_initiation(&initiation("authn", "google")).unwrap();
        let current = state.apply_initiation(&initiation("authz", "discord")).unwrap();
        assert!(!state.complete(&stale));
        assert_eq!(state.awaiting(), Some(ServiceType::Authz));
        assert!(state.complete(&current));
    }
}
