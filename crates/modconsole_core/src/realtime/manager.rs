//! Connection manager: owns the single live realtime connection.
//!
//! A [`RealtimeManager`] is a cheap handle onto one worker task. The worker
//! is the only consumer of the operation queue and the only owner of the
//! socket, the heartbeat timers, the reconnect timer and the backoff state.
//! Public calls, timer expiries and socket events all arrive as work
//! items and are handled one at a time, in submission order.
//!
//! Every connection attempt gets a fresh generation number. Socket events
//! and heartbeat signals carry the generation they were produced for, and
//! anything addressed to a connection the worker has already let go of is
//! dropped on arrival.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::frame::{Frame, RealtimeMessage};
use super::heartbeat::{Heartbeat, HeartbeatSignal};
use super::queue::{Operation, OperationQueue, QueueReceiver};
use super::reconnect::{CLOSE_NORMAL, CloseKind, ReconnectPolicy, RetryDecision};
use super::router::{RouteOutcome, Router, Subscription};
use super::transport::{Connector, EventSink, Socket, SocketEvent, WsConnector, realtime_url};
use crate::auth::Credential;
use crate::config::RealtimeSettings;
use crate::error::Result;
use crate::notice::{self, Notice, NoticeSender};

/// Identity of one successfully opened connection.
///
/// Milliseconds since the Unix epoch at open time, bumped if needed so that
/// every stamp is strictly greater than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionStamp(u64);

impl ConnectionStamp {
    /// Stamp for a connection opened now.
    pub fn next(previous: Option<ConnectionStamp>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        match previous {
            Some(ConnectionStamp(prev)) if now <= prev => ConnectionStamp(prev + 1),
            _ => ConnectionStamp(now),
        }
    }

    /// Raw stamp value.
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Stamp of the most recent successful open (kept after it closes)
    pub stamp: Option<ConnectionStamp>,
    /// Whether that connection is still live
    pub connected: bool,
}

/// Unit of work for the connection worker.
#[derive(Debug)]
pub(crate) enum Work {
    Op(Operation),
    Socket { generation: u64, event: SocketEvent },
    Heartbeat(HeartbeatSignal),
    Send(String),
    Shutdown,
}

impl From<HeartbeatSignal> for Work {
    fn from(signal: HeartbeatSignal) -> Self {
        Work::Heartbeat(signal)
    }
}

struct Shared {
    queue: OperationQueue<Work>,
    router: Arc<Router>,
    status: watch::Receiver<ConnectionStatus>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.queue.submit(Work::Shutdown);
    }
}

/// Handle onto the realtime connection worker.
///
/// Cloning is cheap; when the last clone is dropped the worker runs a final
/// cleanup and stops.
#[derive(Clone)]
pub struct RealtimeManager {
    shared: Arc<Shared>,
}

impl RealtimeManager {
    /// Spawn a worker that connects over websockets.
    ///
    /// Must be called from within a Tokio runtime. Nothing connects until
    /// [`connect`](Self::connect) is called.
    pub fn new(
        credential: Credential,
        api_base: impl Into<String>,
        settings: RealtimeSettings,
        notices: NoticeSender,
    ) -> Self {
        Self::with_connector(
            credential,
            api_base,
            settings,
            Arc::new(WsConnector),
            notices,
        )
    }

    /// Spawn a worker that opens sockets through `connector`.
    pub fn with_connector(
        credential: Credential,
        api_base: impl Into<String>,
        settings: RealtimeSettings,
        connector: Arc<dyn Connector>,
        notices: NoticeSender,
    ) -> Self {
        let (queue, rx) = OperationQueue::new();
        let router = Router::new();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());

        let worker = Worker {
            credential,
            api_base: api_base.into(),
            connector,
            queue: queue.clone(),
            router: Arc::clone(&router),
            socket: None,
            generation: 0,
            live: None,
            heartbeat: Heartbeat::new(settings.ping_interval(), settings.pong_timeout()),
            policy: ReconnectPolicy::new(&settings),
            reconnect_timer: None,
            status: status_tx,
            notices,
        };
        tokio::spawn(worker.run(rx));

        Self {
            shared: Arc::new(Shared {
                queue,
                router,
                status: status_rx,
            }),
        }
    }

    fn submit(&self, work: Work) -> bool {
        let accepted = self.shared.queue.submit(work);
        if !accepted {
            log::debug!("[Realtime] Worker stopped; request dropped");
        }
        accepted
    }

    /// Enqueue a connect. No-op (once executed) without a credential.
    pub fn connect(&self) -> bool {
        self.submit(Work::Op(Operation::Connect))
    }

    /// Enqueue a reconnect: drop the transport and connect again.
    pub fn reconnect(&self) -> bool {
        self.submit(Work::Op(Operation::Reconnect {
            for_generation: None,
        }))
    }

    /// Enqueue a full cleanup: close the connection, stop all timers, forget
    /// subscribers and reset the backoff counter.
    pub fn cleanup(&self) -> bool {
        self.submit(Work::Op(Operation::Cleanup))
    }

    /// Clean up and stop the worker. Later requests are ignored.
    pub fn shutdown(&self) -> bool {
        self.submit(Work::Shutdown)
    }

    /// Send `payload` as JSON if a connection is live.
    ///
    /// Only serialization errors are returned. Without a live connection the
    /// message is dropped; if transmission fails a reconnect is enqueued.
    pub fn send_message<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let text = serde_json::to_string(payload)?;
        self.submit(Work::Send(text));
        Ok(())
    }

    /// Register a callback for inbound topic messages.
    ///
    /// The handler stays registered until the returned guard is dropped or
    /// unsubscribed, or until the next cleanup.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&RealtimeMessage) + Send + Sync + 'static,
    {
        self.shared.router.subscribe(Arc::new(handler))
    }

    /// Register a channel subscriber.
    pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<RealtimeMessage>) {
        self.shared.router.subscribe_channel()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.router.len()
    }

    /// Stamp of the most recently opened connection.
    pub fn connection_stamp(&self) -> Option<ConnectionStamp> {
        self.shared.status.borrow().stamp
    }

    /// Whether a connection is currently live.
    pub fn is_connected(&self) -> bool {
        self.shared.status.borrow().connected
    }

    /// Receiver that is notified whenever the connection opens or closes.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.clone()
    }

    /// Work items submitted but not yet picked up by the worker.
    pub fn pending_operations(&self) -> usize {
        self.shared.queue.pending()
    }
}

impl std::fmt::Debug for RealtimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeManager")
            .field("status", &*self.shared.status.borrow())
            .field("subscribers", &self.shared.router.len())
            .finish()
    }
}

struct Worker {
    credential: Credential,
    api_base: String,
    connector: Arc<dyn Connector>,
    queue: OperationQueue<Work>,
    router: Arc<Router>,
    socket: Option<Box<dyn Socket>>,
    generation: u64,
    /// Generation of the socket currently held, if any.
    live: Option<u64>,
    heartbeat: Heartbeat,
    policy: ReconnectPolicy,
    reconnect_timer: Option<JoinHandle<()>>,
    status: watch::Sender<ConnectionStatus>,
    notices: NoticeSender,
}

impl Worker {
    async fn run(mut self, mut rx: QueueReceiver<Work>) {
        log::debug!("[Realtime] Worker started");
        while let Some(work) = rx.next().await {
            match work {
                Work::Op(op) => {
                    log::debug!("[Realtime] Running {}", op);
                    self.execute(op).await;
                }
                Work::Socket { generation, event } => self.on_socket_event(generation, event),
                Work::Heartbeat(signal) => self.on_heartbeat(signal),
                Work::Send(text) => self.transmit(text),
                Work::Shutdown => {
                    self.cleanup();
                    rx.close();
                    break;
                }
            }
        }
        log::debug!("[Realtime] Worker stopped");
    }

    async fn execute(&mut self, op: Operation) {
        match op {
            Operation::Connect => self.connect().await,
            Operation::Reconnect {
                for_generation: Some(generation),
            } if !self.is_current(generation) => {
                log::debug!(
                    "[Realtime] Skipping reconnect of connection {}; no longer live",
                    generation
                );
            }
            Operation::Reconnect { .. } => {
                self.release();
                self.connect().await;
            }
            Operation::Cleanup => self.cleanup(),
        }
    }

    async fn connect(&mut self) {
        if self.credential.is_blank() {
            log::debug!("[Realtime] No credential; not connecting");
            return;
        }

        self.release();

        let url = match realtime_url(&self.api_base, &self.credential) {
            Ok(url) => url,
            Err(e) => {
                log::error!("[Realtime] Cannot build endpoint URL: {}", e);
                self.notify(Notice::RealtimeMisconfigured {
                    reason: e.to_string(),
                });
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let queue = self.queue.clone();
        let events = EventSink::new(generation, move |generation, event| {
            queue.submit(Work::Socket { generation, event })
        });

        match self.connector.open(&url, events).await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.live = Some(generation);
                self.policy.on_open();

                let stamp = ConnectionStamp::next(self.status.borrow().stamp);
                self.status.send_replace(ConnectionStatus {
                    stamp: Some(stamp),
                    connected: true,
                });
                log::info!(
                    "[Realtime] Connected (connection {}, stamp {})",
                    generation,
                    stamp
                );

                self.heartbeat.start(generation, &self.queue);
            }
            Err(e) => {
                log::warn!("[Realtime] Connection attempt {} failed: {}", generation, e);
                self.retry_after_failure();
            }
        }
    }

    /// Transport-only teardown used before every (re)connect.
    ///
    /// Subscribers and the backoff counter survive.
    fn release(&mut self) {
        self.heartbeat.stop();
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(mut socket) = self.socket.take() {
            socket.close(CLOSE_NORMAL, "Normal closure");
        }
        self.live = None;
        self.mark_disconnected();
    }

    fn cleanup(&mut self) {
        self.release();
        self.router.clear();
        self.policy.reset();
    }

    fn mark_disconnected(&mut self) {
        self.status.send_if_modified(|status| {
            let was_connected = status.connected;
            status.connected = false;
            was_connected
        });
    }

    fn is_current(&self, generation: u64) -> bool {
        self.live == Some(generation)
    }

    fn on_socket_event(&mut self, generation: u64, event: SocketEvent) {
        if !self.is_current(generation) {
            log::debug!(
                "[Realtime] Ignoring event from stale connection {}",
                generation
            );
            return;
        }

        match event {
            SocketEvent::Frame(text) => {
                if self.router.route(&text) == RouteOutcome::Pong && !self.heartbeat.acknowledge() {
                    log::debug!("[Realtime] Unsolicited pong");
                }
            }
            SocketEvent::Closed { code, reason } => self.on_closed(code, &reason),
        }
    }

    fn on_closed(&mut self, code: u16, reason: &str) {
        self.heartbeat.stop();
        // Already closed by the peer; nothing left to send.
        self.socket = None;
        self.live = None;
        self.mark_disconnected();

        match CloseKind::from_code(code) {
            CloseKind::Normal => {
                log::info!("[Realtime] Connection closed normally");
            }
            CloseKind::ConnectionLimit => {
                log::warn!("[Realtime] Connection limit reached; not reconnecting");
                self.notify(Notice::ConnectionLimitReached);
            }
            CloseKind::Abnormal => {
                log::warn!("[Realtime] Connection lost ({} {})", code, reason);
                self.retry_after_failure();
            }
        }
    }

    fn retry_after_failure(&mut self) {
        match self.policy.on_abnormal_close() {
            RetryDecision::Retry { attempt, delay } => {
                log::info!(
                    "[Realtime] Reconnecting in {:?} (attempt {})",
                    delay,
                    attempt
                );
                self.schedule_connect(delay);
            }
            RetryDecision::Restart { cooldown, cycle } => {
                log::error!(
                    "[Realtime] Reconnect attempts exhausted; retrying in {:?}",
                    cooldown
                );
                self.notify(Notice::ReconnectExhausted {
                    cycle,
                    retry_in: cooldown,
                });
                self.schedule_connect(cooldown);
            }
            RetryDecision::GiveUp => {
                log::error!("[Realtime] Reconnect attempts exhausted; giving up");
                self.notify(Notice::ReconnectAbandoned);
            }
        }
    }

    fn schedule_connect(&mut self, delay: Duration) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        let queue = self.queue.clone();
        self.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.submit(Work::Op(Operation::Connect));
        }));
    }

    fn on_heartbeat(&mut self, signal: HeartbeatSignal) {
        match signal {
            HeartbeatSignal::Tick { generation } => {
                if !self.is_current(generation) {
                    return;
                }
                let Some(socket) = self.socket.as_mut() else {
                    return;
                };
                match Frame::Ping.encode().and_then(|ping| socket.send_text(ping)) {
                    Ok(()) => {
                        self.heartbeat.probe_sent(generation, &self.queue);
                    }
                    Err(e) => {
                        log::warn!("[Realtime] Failed to send ping: {}", e);
                        self.reconnect_later(generation);
                    }
                }
            }
            HeartbeatSignal::Expired { generation, probe } => {
                if !self.is_current(generation) || !self.heartbeat.expire(probe) {
                    return;
                }
                log::warn!("[Realtime] No pong received; connection presumed dead");
                self.reconnect_later(generation);
            }
        }
    }

    fn transmit(&mut self, text: String) {
        let (Some(socket), Some(generation)) = (self.socket.as_mut(), self.live) else {
            log::debug!("[Realtime] Not connected; dropping outbound message");
            return;
        };
        if let Err(e) = socket.send_text(text) {
            log::warn!("[Realtime] Failed to send message: {}", e);
            self.reconnect_later(generation);
        }
    }

    /// Queue a reconnect of `generation` behind whatever is already waiting.
    ///
    /// A cleanup queued ahead of it releases the connection, and the
    /// reconnect then finds nothing to replace.
    fn reconnect_later(&mut self, generation: u64) {
        self.heartbeat.stop();
        self.queue.submit(Work::Op(Operation::Reconnect {
            for_generation: Some(generation),
        }));
    }

    fn notify(&self, notice: Notice) {
        notice::publish(&self.notices, notice);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(mut socket) = self.socket.take() {
            socket.close(CLOSE_NORMAL, "Normal closure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{self, NoticeReceiver};
    use crate::realtime::reconnect::{CLOSE_ABNORMAL, CLOSE_CONNECTION_LIMIT};
    use crate::test_utils::MockConnector;
    use serde_json::json;
    use std::sync::Mutex;

    fn settings() -> RealtimeSettings {
        RealtimeSettings {
            exhausted_cooldown_ms: 10_000,
            ..RealtimeSettings::default()
        }
    }

    fn manager(connector: &MockConnector) -> (RealtimeManager, NoticeReceiver) {
        manager_with(connector, settings(), Credential::new("token-1"))
    }

    fn manager_with(
        connector: &MockConnector,
        settings: RealtimeSettings,
        credential: Credential,
    ) -> (RealtimeManager, NoticeReceiver) {
        let (tx, rx) = notice::channel();
        let manager = RealtimeManager::with_connector(
            credential,
            "https://api.example.com",
            settings,
            Arc::new(connector.clone()),
            tx,
        );
        (manager, rx)
    }

    /// Let every ready task run before time moves on.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn elapse(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_credential_is_noop() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager_with(&connector, settings(), Credential::new("  "));

        manager.connect();
        settle().await;

        assert_eq!(connector.opened(), 0);
        assert!(!manager.is_connected());
        assert_eq!(manager.connection_stamp(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_opens_and_pings_immediately() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;

        assert_eq!(connector.opened(), 1);
        assert!(manager.is_connected());
        assert!(manager.connection_stamp().is_some());
        assert_eq!(connector.socket(0).sent(), vec!["ping".to_string()]);
        assert!(connector.urls()[0].starts_with("wss://api.example.com/ws?token=Bearer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_never_leave_two_live_sockets() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        manager.connect();
        manager.reconnect();
        manager.cleanup();
        manager.connect();
        manager.reconnect();
        settle().await;

        assert_eq!(connector.max_live(), 1);
        assert_eq!(connector.live(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_pong_triggers_exactly_one_reconnect() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        let first = manager.connection_stamp();

        elapse(Duration::from_millis(3_100)).await;
        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.socket(0).closed_with(), Some(CLOSE_NORMAL));
        assert_ne!(manager.connection_stamp(), first);

        // Answer the new connection's probe; nothing else should happen.
        connector.socket(1).push_frame("pong");
        elapse(Duration::from_secs(15)).await;
        assert_eq!(connector.opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_is_not_delivered_and_clears_timeout() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let _subscription = manager.subscribe(move |message| {
            recorded.lock().unwrap().push(message.topic.clone());
        });

        manager.connect();
        settle().await;
        connector.socket(0).push_frame("pong");
        elapse(Duration::from_secs(5)).await;

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_repeat_every_interval() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).push_frame("pong");
        elapse(Duration::from_secs(20)).await;
        connector.socket(0).push_frame("pong");
        settle().await;

        assert_eq!(connector.socket(0).sent(), vec!["ping", "ping"]);
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_then_restart() {
        let connector = MockConnector::new();
        connector.fail_next(usize::MAX);
        let (manager, mut notices) = manager(&connector);

        let start = tokio::time::Instant::now();
        let at = |millis: u64| tokio::time::sleep_until(start + Duration::from_millis(millis));

        manager.connect();
        settle().await;
        assert_eq!(connector.attempts(), 1);

        // Attempts at +2s, +4s, +8s, +16s, +32s after the previous one.
        for (attempts, due) in [(2, 2_000), (3, 6_000), (4, 14_000), (5, 30_000), (6, 62_000)] {
            at(due - 10).await;
            assert_eq!(connector.attempts(), attempts - 1, "attempt {} fired early", attempts);
            at(due + 10).await;
            assert_eq!(connector.attempts(), attempts);
        }

        assert!(matches!(
            notices.try_recv(),
            Ok(Notice::ReconnectExhausted { cycle: 1, .. })
        ));

        // New cycle after the cool-down, starting from the smallest delay.
        at(72_010).await;
        assert_eq!(connector.attempts(), 7);
        at(74_010).await;
        assert_eq!(connector.attempts(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_resets_backoff() {
        let connector = MockConnector::new();
        connector.fail_next(3);
        let (manager, _notices) = manager(&connector);

        manager.connect();
        // 0s fail, +2s fail, +4s fail, +8s success.
        elapse(Duration::from_secs(15)).await;
        assert_eq!(connector.attempts(), 4);
        assert!(manager.is_connected());

        let live = connector.opened() - 1;
        connector.socket(live).push_close(CLOSE_ABNORMAL);
        settle().await;
        assert!(!manager.is_connected());

        // Next delay is the first-attempt delay, not 16s.
        elapse(Duration::from_millis(2_100)).await;
        assert_eq!(connector.attempts(), 5);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_waits_for_connect_to_settle() {
        let connector = MockConnector::new();
        let gate = connector.hold_opens();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        manager.cleanup();
        settle().await;
        assert_eq!(connector.opened(), 0);
        assert_eq!(manager.pending_operations(), 1);

        gate.add_permits(1);
        settle().await;

        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.socket(0).closed_with(), Some(CLOSE_NORMAL));
        assert_eq!(connector.live(), 0);
        assert!(!manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_fan_out_in_order_despite_panicking_subscriber() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = manager.subscribe(move |m| first.lock().unwrap().push((1, m.clone())));
        let _b = manager.subscribe(|_| panic!("subscriber failure"));
        let third = Arc::clone(&seen);
        let _c = manager.subscribe(move |m| third.lock().unwrap().push((3, m.clone())));

        manager.connect();
        settle().await;
        connector.socket(0).push_frame(r#"video-done|{"id":5}"#);
        connector.socket(0).push_frame("not a frame");
        connector.socket(0).push_frame(r#"video-done|{"id":6}"#);
        settle().await;

        let seen = seen.lock().unwrap();
        let expected = |id| RealtimeMessage::new("video-done", json!({ "id": id }));
        assert_eq!(
            *seen,
            vec![
                (1, expected(5)),
                (3, expected(5)),
                (1, expected(6)),
                (3, expected(6)),
            ]
        );
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_limit_close_is_terminal() {
        let connector = MockConnector::new();
        let (manager, mut notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).push_close(CLOSE_CONNECTION_LIMIT);
        elapse(Duration::from_secs(120)).await;

        assert_eq!(connector.opened(), 1);
        assert!(!manager.is_connected());
        assert_eq!(notices.try_recv(), Ok(Notice::ConnectionLimitReached));
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_close_does_not_reconnect() {
        let connector = MockConnector::new();
        let (manager, mut notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).push_close(CLOSE_NORMAL);
        elapse(Duration::from_secs(120)).await;

        assert_eq!(connector.opened(), 1);
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_is_idempotent_and_stops_timers() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let _subscription = manager.subscribe(|_| {});

        manager.cleanup();
        manager.connect();
        settle().await;
        manager.cleanup();
        manager.cleanup();
        settle().await;

        assert_eq!(manager.subscriber_count(), 0);
        assert_eq!(connector.live(), 0);

        elapse(Duration::from_secs(120)).await;
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.socket(0).sent(), vec!["ping".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_cancels_pending_retry() {
        let connector = MockConnector::new();
        connector.fail_next(1);
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        manager.cleanup();
        elapse(Duration::from_secs(60)).await;

        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_from_replaced_socket_are_ignored() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let (_subscription, mut rx) = manager.subscribe_channel();

        manager.connect();
        settle().await;
        manager.reconnect();
        settle().await;

        let stale = connector.socket(0);
        stale.push_frame(r#"late|{}"#);
        stale.push_close(CLOSE_ABNORMAL);
        elapse(Duration::from_secs(5)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(connector.opened(), 2);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_message_serializes_when_connected() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.send_message(&json!({ "dropped": true })).unwrap();
        manager.connect();
        settle().await;
        manager.send_message(&json!({ "type": "hello" })).unwrap();
        settle().await;

        assert_eq!(
            connector.socket(0).sent(),
            vec!["ping".to_string(), r#"{"type":"hello"}"#.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_enqueues_reconnect() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).fail_sends();
        manager.send_message(&json!({ "type": "hello" })).unwrap();
        settle().await;

        assert_eq!(connector.opened(), 2);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_after_failed_send_stays_closed() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).fail_sends();
        manager.send_message(&json!({ "type": "hello" })).unwrap();
        manager.cleanup();
        settle().await;

        assert_eq!(connector.live(), 0);
        assert!(!manager.is_connected());

        elapse(Duration::from_secs(60)).await;
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_from_subscriber_at_pong_deadline_stays_closed() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let closer = manager.clone();
        let _subscription = manager.subscribe(move |_| {
            closer.cleanup();
        });

        manager.connect();
        settle().await;
        // Just short of the 3s pong deadline for the first ping.
        elapse(Duration::from_millis(2_998)).await;
        connector.socket(0).push_frame(r#"session-ended|{}"#);
        elapse(Duration::from_secs(30)).await;

        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.live(), 0);
        assert!(!manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ping_reconnects() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        connector.socket(0).push_frame("pong");
        settle().await;
        connector.socket(0).fail_sends();

        // Second tick of the 20s ping interval.
        elapse(Duration::from_secs(20)).await;

        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.socket(0).sent(), vec!["ping".to_string()]);
        assert_eq!(connector.socket(0).closed_with(), Some(CLOSE_NORMAL));
        assert_eq!(connector.socket(1).sent(), vec!["ping".to_string()]);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_reconnect_runs_after_cleanup() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        manager.cleanup();
        manager.reconnect();
        settle().await;

        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.live(), 1);
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_connection_sees_new_stamp() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);
        let mut status = manager.watch_connection();

        manager.connect();
        status.changed().await.unwrap();
        let first = status.borrow_and_update().stamp;
        assert!(first.is_some());

        manager.reconnect();
        settle().await;
        let second = status.borrow().stamp;
        assert!(second > first);
        assert!(status.borrow().connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_shuts_down() {
        let connector = MockConnector::new();
        let (manager, _notices) = manager(&connector);

        manager.connect();
        settle().await;
        drop(manager);
        settle().await;

        assert_eq!(connector.socket(0).closed_with(), Some(CLOSE_NORMAL));
        assert_eq!(connector.live(), 0);
    }

    #[test]
    fn test_stamp_is_strictly_increasing() {
        let far_future = ConnectionStamp(u64::MAX - 1);
        assert_eq!(ConnectionStamp::next(Some(far_future)).as_millis(), u64::MAX);
        let now = ConnectionStamp::next(None);
        assert!(ConnectionStamp::next(Some(now)) > now);
    }
}
