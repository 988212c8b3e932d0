mod support;

use std::sync::{Arc, Mutex};

use common::{issue_session_tokens, BridgeConfig, IncomingRequest, NativeEnvelope, OutgoingResponse};
use serde_json::{json, Value};
use sso_auth_core::{
    AuthSession, CommunicationService, DelegatingService, HostKind, HostWindow, LoginStep, MachineEvent,
    RemoteLog, State, StaticEnvironment, TransportKind,
};
use support::{bridge_config, envelope, facade, Posted, RecordingHost};

fn bind(probe: StaticEnvironment, config: &BridgeConfig) -> TransportKind {
    let host: Arc<dyn HostWindow> = RecordingHost::new();
    DelegatingService::new(&probe, host, config).name()
}

#[test]
fn test_selection_priority() {
    let enabled = bridge_config();
    let everything = StaticEnvironment { opener: true, parent: true, native_bridge: true };

    for _ in 0..3 {
        assert_eq!(bind(everything, &enabled), TransportKind::Popup);
    }
    assert_eq!(
        bind(StaticEnvironment { parent: true, native_bridge: true, ..Default::default() }, &enabled),
        TransportKind::WebView
    );
    assert_eq!(bind(StaticEnvironment::for_kind(HostKind::Embedded), &enabled), TransportKind::Embedded);
    assert_eq!(
        bind(StaticEnvironment::for_kind(HostKind::Embedded), &BridgeConfig::default()),
        TransportKind::Noop
    );
    assert_eq!(bind(StaticEnvironment::default(), &enabled), TransportKind::Noop);
}

#[test]
fn test_host_kind_follows_bound_transport() {
    let host = RecordingHost::new();
    assert_eq!(facade(HostKind::WebView, &host).host_kind(), HostKind::WebView);
    assert_eq!(facade(HostKind::Standalone, &host).host_kind(), HostKind::Standalone);
}

#[test]
fn test_noop_never_fails() {
    let host = RecordingHost::new();
    let bridge = facade(HostKind::Standalone, &host);
    let response = OutgoingResponse::resolve("r1", json!(true));

    assert!(!bridge.is_managed());
    assert!(bridge.send_message(&response).is_ok());
    assert!(bridge.emit_access_token("a", 1).is_ok());
    assert!(bridge.logout().is_ok());
    assert!(bridge.close().is_ok());

    let mut subscription = bridge.listen(Arc::new(|_: IncomingRequest| panic!("noop never delivers")));
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(host.posted().is_empty());
}

#[test]
fn test_popup_posts_to_opener() {
    let host = RecordingHost::new();
    let bridge = facade(HostKind::Popup, &host);

    bridge.emit_access_token("jwt", 1700000000).unwrap();
    bridge.close().unwrap();

    assert_eq!(
        host.posted(),
        vec![
            Posted::Opener {
                message: json!({"type": "access.token", "payload": {"value": "jwt", "expiresAt": 1700000000}}),
                target_origin: "*".into(),
            },
            Posted::Opener {
                message: json!({"event": "PopupUnload"}),
                target_origin: "*".into(),
            },
        ]
    );
}

#[test]
fn test_popup_listen_filters_shape_and_origin() {
    let host = RecordingHost::new();
    let config = BridgeConfig {
        allowed_origins: vec!["https://dapp.example".into()],
        ..BridgeConfig::default()
    };
    let bridge = DelegatingService::new(&StaticEnvironment::for_kind(HostKind::Popup), host, &config);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut subscription = bridge.listen(Arc::new(move |request: IncomingRequest| {
        sink.lock().unwrap().push(request.id)
    }));

    let events = bridge.events();
    events.post_window_message("https://dapp.example", envelope("r1", "personal_sign"));
    events.post_window_message("https://evil.example", envelope("r2", "personal_sign"));
    events.post_window_message("https://dapp.example", json!({"hello": "world"}));
    events.post_window_message("https://dapp.example", json!({"id": 7, "content": {}}));

    subscription.unsubscribe();
    events.post_window_message("https://dapp.example", envelope("r3", "personal_sign"));

    assert_eq!(*seen.lock().unwrap(), vec!["r1".to_string()]);
}

#[test]
fn test_embedded_wraps_envelopes_for_parent() {
    let host = RecordingHost::new();
    let bridge = facade(HostKind::Embedded, &host);

    bridge.send_message(&OutgoingResponse::resolve("r1", json!("0xsig"))).unwrap();
    bridge.close().unwrap();

    let posted = host.posted();
    match &posted[0] {
        Posted::Parent { message, .. } => {
            assert_eq!(message["type"], "embedded");
            assert!(message["payload"].is_string());
        }
        other => panic!("expected a parent post, got {:?}", other),
    }

    let envelopes = host.native_envelopes();
    assert_eq!(envelopes[0].action, "rpc");
    assert_eq!(envelopes[0].payload["requestId"], "r1");
    assert_eq!(envelopes[0].payload["content"]["result"], "0xsig");
    assert_eq!(envelopes[1].action, "closeModal");
}

#[test]
fn test_native_listen_announces_once_and_echoes() {
    let host = RecordingHost::new();
    let bridge = facade(HostKind::WebView, &host);

    let mut first = bridge.listen(Arc::new(|_: IncomingRequest| {}));
    let _second = bridge.listen(Arc::new(|_: IncomingRequest| {}));

    let connected = host
        .native_envelopes()
        .into_iter()
        .filter(|envelope| envelope.action == "connected")
        .count();
    assert_eq!(connected, 1);

    host.clear();
    first.unsubscribe();
    bridge
        .events()
        .on_message_from_native(r#"{"action":"echo","payload":{"message":"hi"}}"#);

    // The second listener's echo responder is still installed
    let envelopes = host.native_envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].action, "echo");
    assert_eq!(envelopes[0].payload, json!({"message": "hi"}));
}

#[test]
fn test_webview_envelope_round_trip() {
    let envelope: NativeEnvelope =
        serde_json::from_value(json!({"action": "echo", "payload": {"message": "hi"}})).unwrap();

    let script = envelope.to_injected_script().unwrap();
    assert!(script.starts_with("window.onMessageFromRN(\""));
    assert!(script.contains(r#"\"action\":\"echo\""#));

    let decoded = NativeEnvelope::from_injected_script(&script).unwrap();
    assert_eq!(decoded, envelope);

    // Native side delivers the decoded literal; the surface answers in kind
    let host = RecordingHost::new();
    let bridge = facade(HostKind::WebView, &host);
    let _subscription = bridge.listen(Arc::new(|_: IncomingRequest| {}));
    host.clear();

    bridge.events().on_message_from_native(&decoded.encode().unwrap());
    match &host.posted()[..] {
        [Posted::Native(data)] => assert_eq!(NativeEnvelope::decode(data).unwrap(), envelope),
        other => panic!("expected one native post, got {:?}", other),
    }
}

#[derive(Default)]
struct CapturingLog(Mutex<Vec<String>>);

impl RemoteLog for CapturingLog {
    fn log(&self, operation: &str, _detail: &Value) {
        self.0.lock().unwrap().push(operation.to_string());
    }
}

#[test]
fn test_webview_writes_remote_log() {
    let host = RecordingHost::new();
    let log = Arc::new(CapturingLog::default());
    let bridge = DelegatingService::with_remote_log(
        &StaticEnvironment::for_kind(HostKind::WebView),
        host,
        &bridge_config(),
        log.clone(),
    );

    assert!(bridge.is_mobile());
    bridge.emit_refresh_token("r", 1).unwrap();
    bridge.logout().unwrap();

    assert_eq!(*log.0.lock().unwrap(), vec!["emitRefreshToken", "logout"]);
}

fn native_rpc(bridge: &DelegatingService, request: Value) {
    let raw = NativeEnvelope {
        action: "rpc".into(),
        payload: request,
    }
    .encode()
    .unwrap();
    bridge.events().on_message_from_native(&raw);
}

#[test]
fn test_session_cancel_over_webview() {
    let host = RecordingHost::new();
    let session = AuthSession::new(facade(HostKind::WebView, &host));
    session.attach();

    native_rpc(session.bridge(), envelope("r1", "eth_signTypedData_v4"));
    assert_eq!(session.snapshot().state, State::Loading);
    assert_eq!(session.pump(), 1);
    assert_eq!(session.dispatch(MachineEvent::ResourcesLoaded { authenticated: true }), State::IncomingSignature);

    host.clear();
    session.dispatch(MachineEvent::Cancel);

    let envelopes = host.native_envelopes();
    let actions: Vec<&str> = envelopes.iter().map(|envelope| envelope.action.as_str()).collect();
    assert_eq!(actions, vec!["rpc", "closeModal"]);
    assert_eq!(envelopes[0].payload["requestId"], "r1");
    assert_eq!(envelopes[0].payload["content"]["error"]["code"], -32002);
}

#[test]
fn test_session_rejects_unsupported_methods() {
    let host = RecordingHost::new();
    let session = AuthSession::new(facade(HostKind::Popup, &host));
    session.attach();
    session.dispatch(MachineEvent::ResourcesLoaded { authenticated: true });

    let events = session.bridge().events();
    events.post_window_message("https://dapp.example", envelope("r1", "eth_mine"));
    events.post_window_message("https://dapp.example", json!({"id": "r2", "content": {}}));
    assert_eq!(session.pump(), 2);

    let responses = host.responses_for("r1");
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["content"]["error"]["code"], 4200);
    assert!(host.responses_for("r2").is_empty());
    assert_eq!(session.snapshot().state, State::Profile);
}

#[test]
fn test_session_open_modal_clears_error() {
    let host = RecordingHost::new();
    let session = AuthSession::new(facade(HostKind::WebView, &host));
    session.attach();
    session.dispatch(MachineEvent::ResourcesLoaded { authenticated: false });
    session.dispatch(MachineEvent::SetError { error: "expired".into() });

    session.bridge().events().on_message_from_native(r#"{"action":"openModal"}"#);
    session.pump();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, State::LoginRequired(LoginStep::Idle));
    assert!(snapshot.context.error.is_none());
}

#[test]
fn test_session_detach_stops_delivery() {
    let host = RecordingHost::new();
    let session = AuthSession::new(facade(HostKind::Popup, &host));
    session.attach();
    session.detach();

    session
        .bridge()
        .events()
        .post_window_message("https://dapp.example", envelope("r1", "personal_sign"));
    assert_eq!(session.pump(), 0);
}

#[test]
fn test_session_emits_tokens() {
    let host = RecordingHost::new();
    let session = AuthSession::new(facade(HostKind::Popup, &host));
    let tokens = issue_session_tokens("0xabc", 900, 86400, b"secret").unwrap();

    session.emit_session_tokens(&tokens).unwrap();

    let messages = host.opener_messages();
    assert_eq!(messages[0]["type"], "access.token");
    assert_eq!(messages[0]["payload"]["value"], tokens.access.value.as_str());
    assert_eq!(messages[1]["type"], "refresh.token");
    assert_eq!(messages[1]["payload"]["expiresAt"], tokens.refresh.expires_at);
}
