use serde_json::Value;

use crate::error::BridgeError;

/// The window capabilities transports are allowed to use.
///
/// Stands in for `window.opener`, `window.parent` and
/// `window.ReactNativeWebView` so transports never probe globals.
pub trait HostWindow: Send + Sync {
    fn post_to_opener(&self, message: Value, target_origin: &str) -> Result<(), BridgeError>;

    fn post_to_parent(&self, message: Value, target_origin: &str) -> Result<(), BridgeError>;

    /// `ReactNativeWebView.postMessage(data)`
    fn post_to_native(&self, data: String) -> Result<(), BridgeError>;

    fn reload(&self);
}
