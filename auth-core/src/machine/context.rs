use common::IncomingRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// At most one pending item per category, all derived from one envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequests {
    /// Raw envelope awaiting an answer
    #[serde(default)]
    pub incoming: Option<IncomingRequest>,
    /// Session/connection preferences attached to the request
    #[serde(default)]
    pub session: Option<Value>,
    #[serde(default)]
    pub signing: Option<Value>,
    #[serde(default)]
    pub transaction: Option<Value>,
    #[serde(default)]
    pub authentication: Option<Value>,
}

impl PendingRequests {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sub-classifications never exist without the envelope they came from.
    pub fn is_consistent(&self) -> bool {
        self.incoming.is_some()
            || (self.signing.is_none() && self.transaction.is_none() && self.authentication.is_none())
    }

    pub fn incoming_id(&self) -> Option<&str> {
        self.incoming.as_ref().map(|request| request.id.as_str())
    }
}

/// Everything the machine knows besides its current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub error: Option<String>,
    pub is_loading_resources: bool,
    pub is_authenticated: bool,
    pub requests: PendingRequests,
}

impl Default for SessionContext {
    // Resources count as loading until RESOURCES_LOADED says otherwise
    fn default() -> Self {
        Self {
            error: None,
            is_loading_resources: true,
            is_authenticated: false,
            requests: PendingRequests::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_consistency() {
        let mut requests = PendingRequests::default();
        assert!(requests.is_consistent() && requests.is_empty());

        requests.signing = Some(json!({}));
        assert!(!requests.is_consistent());

        requests.incoming = Some(IncomingRequest { id: "r1".into(), content: json!({}) });
        assert!(requests.is_consistent());
        assert_eq!(requests.incoming_id(), Some("r1"));
    }

    #[test]
    fn test_partial_requests_deserialize() {
        let requests: PendingRequests =
            serde_json::from_value(json!({"incoming": {"id": "r1", "content": null}})).unwrap();
        assert_eq!(requests.incoming_id(), Some("r1"));
        assert!(requests.transaction.is_none());
    }
}
