//! Inbound frame routing and the subscriber registry.
//!
//! Handlers run synchronously on the connection worker, in subscription
//! order. A panicking handler is logged and skipped; the remaining handlers
//! still see the message.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use super::frame::{Frame, RealtimeMessage};

/// Callback invoked for every inbound topic message.
pub type MessageHandler = Arc<dyn Fn(&RealtimeMessage) + Send + Sync>;

/// What happened to an inbound text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Liveness reply; never forwarded to subscribers
    Pong,
    /// Topic message fanned out; `delivered` handlers returned normally
    Delivered {
        /// Handlers that ran without panicking
        delivered: usize,
        /// Handlers that panicked
        failed: usize,
    },
    /// Frame the client should not receive (a bare `ping`)
    Ignored,
    /// Frame could not be parsed
    Malformed,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, MessageHandler)>,
}

/// Ordered registry of subscriber callbacks.
#[derive(Default)]
pub struct Router {
    registry: Mutex<Registry>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Handlers never run under this lock, so a poisoned guard still holds
        // a consistent list.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a handler. The returned guard removes it again.
    pub fn subscribe(self: &Arc<Self>, handler: MessageHandler) -> Subscription {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.handlers.push((id, handler));
        log::debug!("[Router] Subscriber {} added ({} total)", id, registry.handlers.len());

        Subscription {
            id,
            router: Arc::downgrade(self),
            active: true,
        }
    }

    /// Register a channel-backed subscriber.
    ///
    /// The receiver ends once the subscription is removed (explicitly, by
    /// dropping the guard, or by a cleanup of the connection manager).
    pub fn subscribe_channel(
        self: &Arc<Self>,
    ) -> (Subscription, mpsc::UnboundedReceiver<RealtimeMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(Arc::new(move |message: &RealtimeMessage| {
            if tx.send(message.clone()).is_err() {
                log::debug!("[Router] Channel subscriber dropped its receiver");
            }
        }));
        (subscription, rx)
    }

    fn remove(&self, id: u64) -> bool {
        let mut registry = self.registry();
        let before = registry.handlers.len();
        registry.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != registry.handlers.len()
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        let mut registry = self.registry();
        if !registry.handlers.is_empty() {
            log::debug!("[Router] Clearing {} subscribers", registry.handlers.len());
        }
        registry.handlers.clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.registry().handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a raw inbound frame and fan it out.
    pub fn route(&self, text: &str) -> RouteOutcome {
        match Frame::decode(text) {
            Ok(Frame::Pong) => RouteOutcome::Pong,
            Ok(Frame::Ping) => RouteOutcome::Ignored,
            Ok(Frame::Event(message)) => self.dispatch(&message),
            Err(e) => {
                log::warn!("[Router] Dropping frame: {}", e);
                RouteOutcome::Malformed
            }
        }
    }

    /// Deliver a message to every subscriber in subscription order.
    pub fn dispatch(&self, message: &RealtimeMessage) -> RouteOutcome {
        // Snapshot so handlers may (un)subscribe while being called.
        let handlers: Vec<(u64, MessageHandler)> = self.registry().handlers.clone();

        let mut delivered = 0;
        let mut failed = 0;
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    failed += 1;
                    log::error!(
                        "[Router] Subscriber {} panicked on topic '{}': {}",
                        id,
                        message.topic,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        RouteOutcome::Delivered { delivered, failed }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Handle for a registered subscriber.
///
/// Dropping the guard unsubscribes. Call [`Subscription::detach`] to keep the
/// handler registered until the next cleanup instead.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    router: Weak<Router>,
    active: bool,
}

impl Subscription {
    /// Identifier of this subscriber (unique per manager).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the handler. Returns false if it was already gone
    /// (e.g. cleared by a cleanup).
    pub fn unsubscribe(mut self) -> bool {
        self.active = false;
        match self.router.upgrade() {
            Some(router) => router.remove(self.id),
            None => false,
        }
    }

    /// Keep the handler registered after the guard is dropped.
    pub fn detach(mut self) {
        self.active = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.active
            && let Some(router) = self.router.upgrade()
        {
            router.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
