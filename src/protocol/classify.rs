//! Classification of inbound window messages.
//!
//! The provider shares its message channel with every other wallet listening
//! on the same page, so these predicates must never panic or error on
//! malformed input: anything unrecognized classifies negatively and the
//! transport drops it silently.

use serde_json::Value;

use crate::protocol::objects::{
    AccountProofRequest, SIGNABLE_VERSION, Signable, UserMessageRequest, VIEW_READY_RESPONSE,
};

/// An inbound request to initiate a service exchange.
///
/// `type_tag` is the raw declared tag; recognition of the tag is the state
/// machine's decision, not the classifier's. A non-string tag classifies as
/// an empty tag, which no exchange type matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInitiation {
    pub type_tag: String,
    pub endpoint: String,
    pub uid: Option<String>,
}

/// An inbound view-ready-response carrying an exchange's request body.
#[derive(Debug, Clone)]
pub struct ReadyResponse {
    /// The service type the sender believes this response is for.
    pub declared_type: Option<String>,
    pub body: Option<Value>,
}

/// Classify a raw payload as a service initiation message.
///
/// Succeeds only if the payload is an object whose `service` field carries
/// both a `type` and an `endpoint` field.
pub fn classify_initiation(raw: &Value) -> Option<ServiceInitiation> {
    let service = raw.get("service")?.as_object()?;
    let type_tag = service.get("type")?;
    let endpoint = service.get("endpoint")?;
    Some(ServiceInitiation {
        type_tag: type_tag.as_str().unwrap_or_default().to_string(),
        endpoint: endpoint.as_str().unwrap_or_default().to_string(),
        uid: service
            .get("uid")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Classify a raw payload as a view-ready-response message.
pub fn classify_ready_response(raw: &Value) -> Option<ReadyResponse> {
    if raw.get("type")?.as_str()? != VIEW_READY_RESPONSE {
        return None;
    }
    Some(ReadyResponse {
        declared_type: raw
            .pointer("/service/type")
            .and_then(Value::as_str)
            .map(str::to_string),
        body: raw.get("body").cloned(),
    })
}

/// True iff the body is a `Signable` object at the signable version.
pub fn is_signable_payload(body: &Value) -> bool {
    body.get("f_vsn").and_then(Value::as_str) == Some(SIGNABLE_VERSION)
        && body.get("f_type").and_then(Value::as_str) == Some("Signable")
}

/// True iff the body requests a proof of account ownership.
pub fn is_account_proof_payload(body: &Value) -> bool {
    body.as_object()
        .is_some_and(|obj| obj.contains_key("appIdentifier") && obj.contains_key("nonce"))
}

/// True iff the body carries a user message to sign.
pub fn is_user_message_payload(body: &Value) -> bool {
    body.as_object().is_some_and(|obj| obj.contains_key("message"))
}

/// Extract a typed signable, or `None` when the body is not one.
pub fn parse_signable(body: &Value) -> Option<Signable> {
    if !is_signable_payload(body) {
        return None;
    }
    serde_json::from_value(body.clone()).ok()
}

/// Extract a typed account-proof request, or `None` when the body is not one.
pub fn parse_account_proof(body: &Value) -> Option<AccountProofRequest> {
    if !is_account_proof_payload(body) {
        return None;
    }
    serde_json::from_value(body.clone()).ok()
}

/// Extract a typed user-message request, or `None` when the body is not one.
pub fn parse_user_message(body: &Value) -> Option<UserMessageRequest> {
    if !is_user_message_payload(body) {
        return None;
    }
    serde_json::from_value(body.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initiation_requires_type_and_endpoint() {
        let ok = json!({"service": {"type": "authn", "endpoint": "google"}});
        let init = classify_initiation(&ok).unwrap();
        assert_eq!(init.type_tag, "authn");
        assert_eq!(init.endpoint, "google");
        assert!(init.uid.is_none());

        assert!(classify_initiation(&json!({"service": {"type": "authn"}})).is_none());
        assert!(classify_initiation(&json!({"service": {"endpoint": "google"}})).is_none());
        assert!(classify_initiation(&json!({"service": "authn"})).is_none());
        assert!(classify_initiation(&json!({"type": "authn"})).is_none());
        assert!(classify_initiation(&json!(null)).is_none());
        assert!(classify_initiation(&json!(42)).is_none());
    }

    #[test]
    fn initiation_tolerates_non_string_tags() {
        let odd = json!({"service": {"type": 7, "endpoint": "google"}});
        let init = classify_initiation(&odd).unwrap();
        assert_eq!(init.type_tag, "");
    }

    #[test]
    fn ready_response_matches_literal_type_only() {
        let ok = json!({"type": "FCL:VIEW:READY:RESPONSE", "service": {"type": "authz"}});
        let resp = classify_ready_response(&ok).unwrap();
        assert_eq!(resp.declared_type.as_deref(), Some("authz"));

        assert!(classify_ready_response(&json!({"type": "FCL:VIEW:READY"})).is_none());
        assert!(classify_ready_response(&json!({"type": 1})).is_none());
        assert!(classify_ready_response(&json!("FCL:VIEW:READY:RESPONSE")).is_none());
    }

    #[test]
    fn signable_predicate_checks_both_tags() {
        assert!(is_signable_payload(
            &json!({"f_vsn": "1.0.1", "f_type": "Signable"})
        ));
        // General object version is not the signable version.
        assert!(!is_signable_payload(
            &json!({"f_vsn": "1.0.0", "f_type": "Signable"})
        ));
        assert!(!is_signable_payload(
            &json!({"f_vsn": "1.0.1", "f_type": "PollingResponse"})
        ));
        assert!(!is_signable_payload(&json!(null)));
    }

    #[test]
    fn account_proof_predicate_requires_both_fields() {
        assert!(is_account_proof_payload(
            &json!({"appIdentifier": "Awesome App", "nonce": "aa"})
        ));
        assert!(!is_account_proof_payload(&json!({"appIdentifier": "x"})));
        assert!(!is_account_proof_payload(&json!({"nonce": "aa"})));
        assert!(!is_account_proof_payload(&json!([1, 2])));
    }

    #[test]
    fn user_message_predicate() {
        assert!(is_user_message_payload(&json!({"message": "deadbeef"})));
        assert!(!is_user_message_payload(&json!({"msg": "deadbeef"})));
    }

    #[test]
    fn parse_helpers_return_none_for_noise() {
        assert!(parse_signable(&json!({"f_type": "Signable"})).is_none());
        assert!(parse_account_proof(&json!({})).is_none());
        assert!(parse_user_message(&json!({})).is_none());
    }
}
