#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use common::{BridgeConfig, IncomingRequest, NativeEnvelope};
use serde_json::{json, Value};
use sso_auth_core::{BridgeError, DelegatingService, HostKind, HostWindow, PendingRequests, StaticEnvironment};

/// Something a transport pushed out of the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Posted {
    Opener { message: Value, target_origin: String },
    Parent { message: Value, target_origin: String },
    Native(String),
}

/// In-memory window that remembers every post.
#[derive(Default)]
pub struct RecordingHost {
    posted: Mutex<Vec<Posted>>,
    reloads: Mutex<usize>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    pub fn reloads(&self) -> usize {
        *self.reloads.lock().unwrap()
    }

    /// Messages posted to the opener, in order.
    pub fn opener_messages(&self) -> Vec<Value> {
        self.posted()
            .into_iter()
            .filter_map(|posted| match posted {
                Posted::Opener { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Native envelopes, whether sent to React Native or wrapped for the parent.
    pub fn native_envelopes(&self) -> Vec<NativeEnvelope> {
        self.posted()
            .into_iter()
            .filter_map(|posted| match posted {
                Posted::Native(data) => NativeEnvelope::decode(&data).ok(),
                Posted::Parent { message, .. } => {
                    assert_eq!(message["type"], "embedded");
                    NativeEnvelope::decode(message["payload"].as_str()?).ok()
                }
                _ => None,
            })
            .collect()
    }

    /// Response envelopes regardless of transport.
    pub fn responses(&self) -> Vec<Value> {
        let mut responses: Vec<Value> = self
            .opener_messages()
            .into_iter()
            .filter(|message| message.get("requestId").is_some())
            .collect();
        responses.extend(
            self.native_envelopes()
                .into_iter()
                .filter(|envelope| envelope.action == "rpc" && envelope.payload.get("requestId").is_some())
                .map(|envelope| envelope.payload),
        );
        responses
    }

    pub fn responses_for(&self, request_id: &str) -> Vec<Value> {
        self.responses()
            .into_iter()
            .filter(|response| response["requestId"] == request_id)
            .collect()
    }

    pub fn clear(&self) {
        self.posted.lock().unwrap().clear();
    }
}

impl HostWindow for RecordingHost {
    fn post_to_opener(&self, message: Value, target_origin: &str) -> Result<(), BridgeError> {
        self.posted.lock().unwrap().push(Posted::Opener {
            message,
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }

    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), BridgeError> {
        self.posted.lock().unwrap().push(Posted::Parent {
            message,
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }

    fn post_to_native(&self, data: String) -> Result<(), BridgeError> {
        self.posted.lock().unwrap().push(Posted::Native(data));
        Ok(())
    }

    fn reload(&self) {
        *self.reloads.lock().unwrap() += 1;
    }
}

pub fn bridge_config() -> BridgeConfig {
    BridgeConfig {
        embedded_enabled: true,
        ..BridgeConfig::default()
    }
}

pub fn facade(kind: HostKind, host: &Arc<RecordingHost>) -> DelegatingService {
    let host: Arc<dyn HostWindow> = Arc::clone(host) as Arc<dyn HostWindow>;
    DelegatingService::new(&StaticEnvironment::for_kind(kind), host, &bridge_config())
}

pub fn envelope(id: &str, method: &str) -> Value {
    json!({
        "id": id,
        "content": { "action": { "method": method, "params": [] } }
    })
}

pub fn pending(id: &str, category: &str) -> PendingRequests {
    let action = json!({ "method": "test" });
    let mut requests = PendingRequests {
        incoming: Some(IncomingRequest {
            id: id.to_string(),
            content: json!({ "action": action }),
        }),
        ..PendingRequests::default()
    };
    match category {
        "signing" => requests.signing = Some(action),
        "transaction" => requests.transaction = Some(action),
        "authentication" => requests.authentication = Some(action),
        _ => {}
    }
    requests
}
