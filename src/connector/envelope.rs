//! Outbound envelope construction.

use serde_json::{Value, json};

use crate::protocol::objects::{
    OBJECT_VERSION, PollingResponse, ResponseData, Status, VIEW_READY, VIEW_RESPONSE,
};

/// Reason string carried by declined signing exchanges.
pub const DECLINED_REASON: &str = "Declined.";

/// The fixed acknowledgement sent for a recognized service initiation.
pub fn ready_message() -> Value {
    json!({ "type": VIEW_READY })
}

/// An approved envelope carrying the variant payload.
pub fn approved(data: ResponseData) -> PollingResponse {
    PollingResponse {
        message_type: VIEW_RESPONSE,
        f_type: "PollingResponse",
        f_vsn: OBJECT_VERSION,
        status: Status::Approved,
        reason: None,
        data: Some(data),
    }
}

/// A declined envelope. Never carries data, only the reason.
pub fn declined(reason: &str) -> PollingResponse {
    PollingResponse {
        message_type: VIEW_RESPONSE,
        f_type: "PollingResponse",
        f_vsn: OBJECT_VERSION,
        status: Status::Declined,
        reason: Some(reason.to_string()),
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::objects::CompositeSignature;

    #[test]
    fn ready_message_shape() {
        assert_eq!(ready_message(), json!({"type": "FCL:VIEW:READY"}));
    }

    #[test]
    fn approved_envelope_has_null_reason_and_data() {
        let envelope = approved(ResponseData::Signature(CompositeSignature::new(
            "0x1", 0, "cafe",
        )));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "FCL:VIEW:RESPONSE");
        assert_eq!(value["f_type"], "PollingResponse");
        assert_eq!(value["f_vsn"], OBJECT_VERSION);
        assert_eq!(value["status"], "APPROVED");
        assert_eq!(value["reason"], Value::Null);
        assert_eq!(value["data"]["signature"], "cafe");
        assert_eq!(value["data"]["keyId"], 0);
    }

    #[test]
    fn declined_envelope_omits_data() {
        let envelope = declined(DECLINED_REASON);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "DECLINED");
        assert_eq!(value["reason"], "Declined.");
        assert!(value.get("data").is_none());
    }
}
