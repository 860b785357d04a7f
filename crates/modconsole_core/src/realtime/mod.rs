//! Realtime channel to the moderation backend.
//!
//! The pieces, bottom up:
//!
//! - [`frame`]: wire format (`ping`, `pong`, `topic|json`)
//! - [`queue`]: FIFO that serializes every connection operation
//! - [`heartbeat`]: ping interval and pong deadline timers
//! - [`reconnect`]: close-code classification and exponential backoff
//! - [`router`]: subscriber registry and frame fan-out
//! - [`transport`]: the socket seam and its `tokio-tungstenite` implementation
//! - [`manager`]: the worker tying them together behind [`RealtimeManager`]
//!
//! ```no_run
//! use modconsole_core::auth::Credential;
//! use modconsole_core::config::Config;
//! use modconsole_core::notice;
//! use modconsole_core::realtime::{RealtimeManager, VIDEO_EDIT_COMPLETED};
//!
//! # async fn demo() {
//! let config = Config::default();
//! let (notices, _rx) = notice::channel();
//! let manager = RealtimeManager::new(
//!     Credential::new("token"),
//!     config.api_base_url.clone(),
//!     config.realtime.clone(),
//!     notices,
//! );
//!
//! let subscription = manager.subscribe(|message| {
//!     if message.is(VIDEO_EDIT_COMPLETED) {
//!         println!("edit finished: {}", message.payload);
//!     }
//! });
//! manager.connect();
//! # subscription.detach();
//! # }
//! ```

pub mod frame;
pub mod heartbeat;
pub mod manager;
pub mod queue;
pub mod reconnect;
pub mod router;
pub mod transport;

pub use frame::{Frame, RealtimeMessage, VIDEO_EDIT_COMPLETED};
pub use manager::{ConnectionStamp, ConnectionStatus, RealtimeManager};
pub use queue::Operation;
pub use reconnect::{CLOSE_CONNECTION_LIMIT, CLOSE_NORMAL};
pub use router::{MessageHandler, Subscription};
pub use transport::{BoxFuture, Connector, EventSink, Socket, SocketEvent, WsConnector};
