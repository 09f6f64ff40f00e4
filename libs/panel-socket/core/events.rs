//! Event subscription
//!
//! Handlers are registered per event name and invoked in registration order.
//! Emission snapshots the handler list before invoking anything, so a
//! handler may subscribe or unsubscribe (including itself) without
//! deadlocking the registry.
//!
//! ```text
//! inbound {"type":"card_detected",...}
//!     ├─> handlers["card_detected"]  (in order)
//!     └─> handlers["message"]        (in order)
//! ```

use crate::traits::Result;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::error;

/// Built-in event names
pub mod names {
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const MANUAL_DISCONNECT: &str = "manual_disconnect";
    pub const RECONNECTING: &str = "reconnecting";
    pub const RECONNECT_FAILED: &str = "reconnect_failed";
    pub const ERROR: &str = "error";
    pub const MESSAGE: &str = "message";
}

/// Payload delivered to socket event handlers
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// The connection opened
    Connected,
    /// The connection closed (clean or not)
    Disconnected { code: u16, reason: String },
    /// `disconnect()` tore the connection down
    ManualDisconnect,
    /// A reconnect attempt is starting
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnect attempts ran out; no further attempts are scheduled
    ReconnectFailed { attempts: u32 },
    /// A connection-level error occurred
    Error(String),
    /// Inbound JSON frame (under its `type` name and under `message`)
    Message(Value),
    /// Inbound text frame that was not JSON
    Raw(String),
    /// Inbound binary frame
    Binary(Vec<u8>),
}

impl SocketEvent {
    /// Parsed JSON payload, if this is a JSON message
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            SocketEvent::Message(value) => Some(value),
            _ => None,
        }
    }
}

/// Identifies one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<E> = Arc<dyn Fn(&E) -> Result<()> + Send + Sync>;

struct Entry<E> {
    id: HandlerId,
    once: bool,
    handler: Handler<E>,
}

struct Handlers<E> {
    next_id: u64,
    by_name: HashMap<String, Vec<Entry<E>>>,
}

/// Ordered handler lists keyed by event name
pub struct EventRegistry<E> {
    handlers: Arc<Mutex<Handlers<E>>>,
}

impl<E: 'static> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Handlers {
                next_id: 0,
                by_name: HashMap::new(),
            })),
        }
    }

    /// Register a handler for every emission of `name`
    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> Subscription<E>
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        self.register(name.into(), false, Arc::new(handler))
    }

    /// Register a handler that removes itself after its first invocation
    pub fn once<F>(&self, name: impl Into<String>, handler: F) -> Subscription<E>
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        self.register(name.into(), true, Arc::new(handler))
    }

    fn register(&self, name: String, once: bool, handler: Handler<E>) -> Subscription<E> {
        let mut guard = self.handlers.lock();
        let id = HandlerId(guard.next_id);
        guard.next_id += 1;
        guard
            .by_name
            .entry(name.clone())
            .or_default()
            .push(Entry { id, once, handler });

        Subscription {
            name,
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Remove one handler; returns whether it was registered
    pub fn off(&self, name: &str, id: HandlerId) -> bool {
        remove_handler(&self.handlers, name, id)
    }

    /// Remove every handler for `name`, or every handler when `None`
    pub fn off_all(&self, name: Option<&str>) {
        let mut guard = self.handlers.lock();
        match name {
            Some(name) => {
                guard.by_name.remove(name);
            }
            None => guard.by_name.clear(),
        }
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers
            .lock()
            .by_name
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler of `name`
    ///
    /// A failing or panicking handler is logged and does not stop delivery
    /// to the remaining handlers. Returns the number of handlers that
    /// completed successfully.
    pub fn emit(&self, name: &str, event: &E) -> usize {
        let snapshot: Vec<Handler<E>> = {
            let mut guard = self.handlers.lock();
            let Some(entries) = guard.by_name.get_mut(name) else {
                return 0;
            };
            let snapshot = entries.iter().map(|e| Arc::clone(&e.handler)).collect();
            entries.retain(|e| !e.once);
            let now_empty = entries.is_empty();
            if now_empty {
                guard.by_name.remove(name);
            }
            snapshot
        };

        let mut delivered = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => error!("Handler for '{}' failed: {}", name, e),
                Err(_) => error!("Handler for '{}' panicked", name),
            }
        }
        delivered
    }
}

impl<E: 'static> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

fn remove_handler<E>(handlers: &Mutex<Handlers<E>>, name: &str, id: HandlerId) -> bool {
    let mut guard = handlers.lock();
    let Some(entries) = guard.by_name.get_mut(name) else {
        return false;
    };
    let before = entries.len();
    entries.retain(|e| e.id != id);
    let removed = entries.len() != before;
    let now_empty = entries.is_empty();
    if now_empty {
        guard.by_name.remove(name);
    }
    removed
}

/// Token returned by `on`/`once`
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`]
/// to remove it.
pub struct Subscription<E> {
    name: String,
    id: HandlerId,
    handlers: Weak<Mutex<Handlers<E>>>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the handler; returns false if it was already gone
    pub fn unsubscribe(self) -> bool {
        match self.handlers.upgrade() {
            Some(handlers) => remove_handler(&handlers, &self.name, self.id),
            None => false,
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}
