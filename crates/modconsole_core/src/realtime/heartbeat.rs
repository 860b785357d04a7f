//! Liveness monitor for the realtime channel.
//!
//! The monitor owns two timers: a ticker that asks the worker to send a
//! probe every interval (the first one immediately), and a deadline armed
//! after each probe. Both only ever submit signals to the operation queue;
//! deciding what to do about them stays with the worker.
//!
//! Each probe gets a sequence number. A deadline only counts if its probe
//! is still the outstanding one, so a reply racing the deadline, or a
//! deadline left over from an older probe, can never trigger a reconnect.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::queue::OperationQueue;

/// Timer output submitted to the operation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatSignal {
    /// Time to send a probe on connection `generation`
    Tick {
        /// Connection the ticker was started for
        generation: u64,
    },
    /// No reply to `probe` arrived before the deadline
    Expired {
        /// Connection the probe was sent on
        generation: u64,
        /// Probe sequence number
        probe: u64,
    },
}

/// Ping interval / pong deadline bookkeeping.
pub struct Heartbeat {
    interval: Duration,
    timeout: Duration,
    ticker: Option<JoinHandle<()>>,
    deadline: Option<JoinHandle<()>>,
    outstanding: Option<u64>,
    last_probe: u64,
}

impl Heartbeat {
    /// Create a stopped monitor.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            ticker: None,
            deadline: None,
            outstanding: None,
            last_probe: 0,
        }
    }

    /// Start ticking for `generation`. Restarts from scratch if already running.
    pub fn start<T>(&mut self, generation: u64, queue: &OperationQueue<T>)
    where
        T: From<HeartbeatSignal> + Send + 'static,
    {
        self.stop();

        let interval = self.interval;
        let queue = queue.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !queue.submit(T::from(HeartbeatSignal::Tick { generation })) {
                    break;
                }
            }
        }));
        log::debug!(
            "[Heartbeat] Started for connection {} (every {:?}, timeout {:?})",
            generation,
            self.interval,
            self.timeout
        );
    }

    /// Record that a probe went out and arm its deadline.
    ///
    /// Any earlier deadline is cancelled, so at most one is ever live.
    pub fn probe_sent<T>(&mut self, generation: u64, queue: &OperationQueue<T>) -> u64
    where
        T: From<HeartbeatSignal> + Send + 'static,
    {
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }

        self.last_probe += 1;
        let probe = self.last_probe;
        self.outstanding = Some(probe);

        let timeout = self.timeout;
        let queue = queue.clone();
        self.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            queue.submit(T::from(HeartbeatSignal::Expired { generation, probe }));
        }));

        probe
    }

    /// A liveness reply arrived. Returns whether a probe was outstanding.
    pub fn acknowledge(&mut self) -> bool {
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
        self.outstanding.take().is_some()
    }

    /// Consume a deadline signal. Returns true only if `probe` is still
    /// unanswered, i.e. the connection should be treated as dead.
    pub fn expire(&mut self, probe: u64) -> bool {
        if self.outstanding != Some(probe) {
            return false;
        }
        self.outstanding = None;
        self.deadline = None;
        true
    }

    /// Clear both timers.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(deadline) = self.deadline.take() {
            deadline.abort();
        }
        self.outstanding = None;
    }

    /// Whether the ticker is running.
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Whether a probe is waiting for its reply.
    pub fn is_awaiting_reply(&self) -> bool {
        self.outstanding.is_some()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
