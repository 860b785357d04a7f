//! Test utilities for modconsole_core
//!
//! Provides an in-memory [`Connector`] whose sockets record what was sent
//! and let tests inject inbound frames and closures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use url::Url;

use crate::error::{ConsoleError, Result};
use crate::realtime::{BoxFuture, Connector, EventSink, Socket};

#[derive(Default)]
struct ConnectorState {
    attempts: usize,
    fail_next: usize,
    live: usize,
    max_live: usize,
    urls: Vec<String>,
    sockets: Vec<MockSocketHandle>,
    gate: Option<Arc<Semaphore>>,
}

/// A mock realtime connector.
///
/// Clones share state, so a test keeps one clone for assertions and hands
/// another to the manager.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    /// Create a connector whose opens succeed immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` opens fail.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().fail_next = count;
    }

    /// Block opens until permits are added to the returned semaphore.
    /// Each permit lets exactly one open through.
    pub fn hold_opens(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().gate = Some(Arc::clone(&gate));
        gate
    }

    /// Open calls so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    /// Sockets successfully opened so far.
    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().sockets.len()
    }

    /// Sockets currently open.
    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    /// Highest number of simultaneously open sockets seen.
    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    /// URLs passed to every open call.
    pub fn urls(&self) -> Vec<String> {
        self.state.lock().unwrap().urls.clone()
    }

    /// Handle onto the `index`th successfully opened socket.
    pub fn socket(&self, index: usize) -> MockSocketHandle {
        self.state.lock().unwrap().sockets[index].clone()
    }
}

impl Connector for MockConnector {
    fn open<'a>(
        &'a self,
        url: &'a Url,
        events: EventSink,
    ) -> BoxFuture<'a, Result<Box<dyn Socket>>> {
        Box::pin(async move {
            let gate = {
                let mut state = self.state.lock().unwrap();
                state.attempts += 1;
                state.urls.push(url.to_string());
                state.gate.clone()
            };
            if let Some(gate) = gate {
                gate.acquire()
                    .await
                    .expect("gate semaphore closed")
                    .forget();
            }

            let mut state = self.state.lock().unwrap();
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(ConsoleError::ConnectionClosed);
            }

            let handle = MockSocketHandle {
                events,
                inner: Arc::new(SocketRecord::default()),
            };
            state.sockets.push(handle.clone());
            state.live += 1;
            state.max_live = state.max_live.max(state.live);

            Ok(Box::new(MockSocket {
                handle,
                connector: Arc::clone(&self.state),
                released: false,
            }) as Box<dyn Socket>)
        })
    }
}

#[derive(Default)]
struct SocketRecord {
    sent: Mutex<Vec<String>>,
    closed_with: Mutex<Option<u16>>,
    fail_sends: AtomicBool,
}

/// Test-side view of a mock socket.
#[derive(Clone)]
pub struct MockSocketHandle {
    events: EventSink,
    inner: Arc<SocketRecord>,
}

impl MockSocketHandle {
    /// Frames the manager sent on this socket.
    pub fn sent(&self) -> Vec<String> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Close code the manager used, if it closed the socket.
    pub fn closed_with(&self) -> Option<u16> {
        *self.inner.closed_with.lock().unwrap()
    }

    /// Make every further send on this socket fail.
    pub fn fail_sends(&self) {
        self.inner.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Deliver an inbound text frame.
    pub fn push_frame(&self, text: &str) {
        self.events.frame(text);
    }

    /// Simulate the peer closing the connection.
    pub fn push_close(&self, code: u16) {
        self.events.closed(code, "mock close");
    }
}

struct MockSocket {
    handle: MockSocketHandle,
    connector: Arc<Mutex<ConnectorState>>,
    released: bool,
}

impl MockSocket {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.connector.lock().unwrap().live -= 1;
        }
    }
}

impl Socket for MockSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        if self.released || self.handle.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(ConsoleError::ConnectionClosed);
        }
        self.handle.inner.sent.lock().unwrap().push(text);
        Ok(())
    }

    fn close(&mut self, code: u16, _reason: &str) {
        if self.released {
            return;
        }
        *self.handle.inner.closed_with.lock().unwrap() = Some(code);
        self.release();
    }
}

impl Drop for MockSocket {
    fn drop(&mut self) {
        self.release();
    }
}
