//! Single-consumer FIFO that serializes connection work.
//!
//! Every producer (public API calls, timers, socket reader tasks) submits
//! into the queue; exactly one consumer takes items off and awaits each to
//! completion before taking the next. Nothing that mutates connection state
//! runs outside that consumer, so connect, reconnect and cleanup can never
//! interleave.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

/// Connection lifecycle operations accepted by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Open a connection (no-op without a credential)
    Connect,
    /// Tear down the transport and connect again.
    ///
    /// With `for_generation` set, only if that connection is still the live
    /// one when the operation runs.
    Reconnect { for_generation: Option<u64> },
    /// Close everything and forget subscribers
    Cleanup,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Connect => write!(f, "connect"),
            Operation::Reconnect {
                for_generation: None,
            } => write!(f, "reconnect"),
            Operation::Reconnect {
                for_generation: Some(generation),
            } => write!(f, "reconnect of connection {}", generation),
            Operation::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Producer side of the queue. Cheap to clone.
pub struct OperationQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    pending: Arc<AtomicUsize>,
}

impl<T> Clone for OperationQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

/// Consumer side of the queue. Owned by the single worker.
pub struct QueueReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
    pending: Arc<AtomicUsize>,
}

impl<T> OperationQueue<T> {
    /// Create a connected producer/consumer pair.
    pub fn new() -> (Self, QueueReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            Self {
                tx,
                pending: Arc::clone(&pending),
            },
            QueueReceiver { rx, pending },
        )
    }

    /// Append an item. Returns false once the consumer is gone.
    pub fn submit(&self, item: T) -> bool {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(item).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Items submitted but not yet taken by the consumer.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether the consumer has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> QueueReceiver<T> {
    /// Take the next item, waiting if the queue is empty.
    ///
    /// Returns `None` once every producer is dropped and the queue is drained.
    pub async fn next(&mut self) -> Option<T> {
        let item = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(item)
    }

    /// Stop accepting new items; already queued items can still be taken.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
