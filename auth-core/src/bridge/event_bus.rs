use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{NativeAction, NativeEnvelope};
use dashmap::DashMap;
use serde_json::Value;

/// Key under which raw window `message` events are emitted.
pub const WINDOW_MESSAGE: &str = "message";

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    handlers: DashMap<String, Vec<(u64, Handler<T>)>>,
    next_id: AtomicU64,
}

/// Keyed emitter. Each instance is isolated; clones share handlers.
pub struct EventBus<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> EventBus<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                handlers: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn on<F>(&self, key: &str, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .handlers
            .entry(key.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        let registry = Arc::clone(&self.registry);
        let key = key.to_string();
        Subscription::new(move || {
            if let Some(mut entry) = registry.handlers.get_mut(&key) {
                entry.retain(|(handler_id, _)| *handler_id != id);
            }
        })
    }

    /// Invoke every handler registered under `key`, in registration order.
    /// Returns how many ran.
    pub fn emit(&self, key: &str, payload: &T) -> usize {
        // Snapshot first so handlers may (un)register without holding the shard lock
        let handlers: Vec<Handler<T>> = match self.registry.handlers.get(key) {
            Some(entry) => entry.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.registry
            .handlers
            .get(key)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

/// Deregistration handle returned by every `listen`/`on`.
pub struct Subscription {
    cancel: Vec<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: vec![Box::new(cancel)],
        }
    }

    pub fn noop() -> Self {
        Self { cancel: Vec::new() }
    }

    pub fn combine(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        Self {
            cancel: subscriptions
                .into_iter()
                .flat_map(|subscription| subscription.cancel)
                .collect(),
        }
    }

    pub fn unsubscribe(&mut self) {
        for cancel in self.cancel.drain(..) {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_empty()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A `postMessage` event as seen by the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    pub origin: String,
    pub data: Value,
}

/// Inbound traffic from the host: window messages plus native actions.
#[derive(Clone, Default)]
pub struct HostEvents {
    window: EventBus<WindowMessage>,
    native: EventBus<Value>,
}

impl HostEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> &EventBus<WindowMessage> {
        &self.window
    }

    pub fn native(&self) -> &EventBus<Value> {
        &self.native
    }

    pub fn post_window_message(&self, origin: &str, data: Value) -> usize {
        let message = WindowMessage {
            origin: origin.to_string(),
            data,
        };
        self.window.emit(WINDOW_MESSAGE, &message)
    }

    /// Entry point the native host reaches through injected script.
    pub fn on_message_from_native(&self, raw: &str) -> usize {
        let envelope = match NativeEnvelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Dropping malformed native message: {}", e);
                return 0;
            }
        };

        if envelope.known_action().is_none() {
            tracing::warn!("Dropping native message with unknown action: {}", envelope.action);
            return 0;
        }

        tracing::debug!("Native message received: {}", envelope.action);
        self.native.emit(&envelope.action, &envelope.payload)
    }

    pub fn register_native_handler<F>(&self, action: NativeAction, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.native.on(action.as_str(), handler)
    }
}
