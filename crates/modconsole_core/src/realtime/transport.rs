//! Transport seam between the connection manager and the network.
//!
//! The manager only ever talks to a [`Connector`] and the [`Socket`]s it
//! returns. Inbound traffic travels the other way through an [`EventSink`]
//! stamped with the connection's generation, so events from a socket the
//! manager already discarded can be recognised and dropped.
//!
//! [`WsConnector`] is the production implementation on `tokio-tungstenite`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use super::reconnect::CLOSE_ABNORMAL;
use crate::auth::Credential;
use crate::error::{ConsoleError, Result};

/// Boxed future returned by [`Connector::open`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that happened on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Text frame received
    Frame(String),
    /// Socket closed (by the peer or by a transport failure)
    Closed {
        /// Websocket close code
        code: u16,
        /// Close reason or error description
        reason: String,
    },
}

type Deliver = Arc<dyn Fn(u64, SocketEvent) -> bool + Send + Sync>;

/// Inbound event channel for one connection attempt.
#[derive(Clone)]
pub struct EventSink {
    generation: u64,
    deliver: Deliver,
}

impl EventSink {
    /// Create a sink that hands events for `generation` to `deliver`.
    pub fn new<F>(generation: u64, deliver: F) -> Self
    where
        F: Fn(u64, SocketEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            generation,
            deliver: Arc::new(deliver),
        }
    }

    /// Connection generation this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns false once the manager is gone.
    pub fn emit(&self, event: SocketEvent) -> bool {
        (self.deliver)(self.generation, event)
    }

    /// Report an inbound text frame.
    pub fn frame(&self, text: impl Into<String>) -> bool {
        self.emit(SocketEvent::Frame(text.into()))
    }

    /// Report that the socket closed.
    pub fn closed(&self, code: u16, reason: impl Into<String>) -> bool {
        self.emit(SocketEvent::Closed {
            code,
            reason: reason.into(),
        })
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// An open connection, as seen by the manager.
pub trait Socket: Send {
    /// Queue a text frame for transmission.
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Close with the given code. Idempotent.
    fn close(&mut self, code: u16, reason: &str);
}

/// Opens sockets to the realtime endpoint.
pub trait Connector: Send + Sync {
    /// Open a connection to `url`, reporting inbound traffic to `events`.
    ///
    /// The future resolves once the handshake has completed (or failed).
    fn open<'a>(&'a self, url: &'a Url, events: EventSink)
    -> BoxFuture<'a, Result<Box<dyn Socket>>>;
}

/// Build the realtime endpoint URL for a credential.
///
/// `http(s)` bases are mapped to `ws(s)`, `/ws` is appended to the base
/// path, and the credential goes into the `token` query parameter.
pub fn realtime_url(api_base: &str, credential: &Credential) -> Result<Url> {
    let invalid = |source| ConsoleError::InvalidUrl {
        url: api_base.to_string(),
        source,
    };

    let mut url = Url::parse(api_base).map_err(invalid)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase)),
    };
    // Switching between special schemes cannot fail.
    let _ = url.set_scheme(scheme);

    url.path_segments_mut()
        .map_err(|_| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push("ws");
    url.query_pairs_mut()
        .clear()
        .append_pair("token", &format!("Bearer {}", credential.as_str()));

    Ok(url)
}

/// URL without its query string, safe for logs.
pub(crate) fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// `tokio-tungstenite` implementation of [`Connector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open<'a>(
        &'a self,
        url: &'a Url,
        events: EventSink,
    ) -> BoxFuture<'a, Result<Box<dyn Socket>>> {
        Box::pin(async move {
            log::info!("[Realtime] Connecting to {}", redacted(url));
            let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
            let (mut write, mut read) = stream.split();
            let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

            let writer_events = events.clone();
            let writer = tokio::spawn(async move {
                while let Some(message) = outgoing_rx.recv().await {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(e) = write.send(message).await {
                        log::warn!("[Realtime] Failed to write frame: {}", e);
                        writer_events.closed(CLOSE_ABNORMAL, e.to_string());
                        break;
                    }
                    if closing {
                        break;
                    }
                }
            });

            let reader = tokio::spawn(async move {
                loop {
                    match read.next().await {
                        Some(Ok(Message::Text(text))) => {
                            events.frame(text.as_str());
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                                .unwrap_or((u16::from(CloseCode::Status), String::new()));
                            log::info!("[Realtime] Server closed connection: {} {}", code, reason);
                            events.closed(code, reason);
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary and protocol-level ping/pong frames are not
                            // part of the console protocol.
                        }
                        Some(Err(e)) => {
                            log::warn!("[Realtime] WebSocket error: {}", e);
                            events.closed(CLOSE_ABNORMAL, e.to_string());
                            break;
                        }
                        None => {
                            events.closed(CLOSE_ABNORMAL, "stream ended");
                            break;
                        }
                    }
                }
            });

            Ok(Box::new(WsSocket {
                outgoing,
                reader,
                writer,
                closed: false,
            }) as Box<dyn Socket>)
        })
    }
}

struct WsSocket {
    outgoing: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    closed: bool,
}

impl Socket for WsSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(ConsoleError::ConnectionClosed);
        }
        self.outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| ConsoleError::ConnectionClosed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Stop reporting; the writer still flushes the close frame.
        self.reader.abort();
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.outgoing.send(Message::Close(Some(frame)));
    }
}

impl Drop for WsSocket {
    fn drop(&mut self) {
        self.reader.abort();
        if !self.closed {
            self.writer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("abc123")
    }

    #[test]
    fn test_realtime_url_maps_scheme_and_adds_token() {
        let url = realtime_url("https://api-stage.flingzy.com", &credential()).unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/ws");
        let token: Vec<_> = url.query_pairs().collect();
        assert_eq!(token.len(), 1);
        assert_eq!(token[0].0, "token");
        assert_eq!(token[0].1, "Bearer abc123");
    }

    #[test]
    fn test_realtime_url_keeps_base_path() {
        let url = realtime_url("http://localhost:8080/api/", &credential()).unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/api/ws");
    }

    #[test]
    fn test_realtime_url_rejects_other_schemes() {
        assert!(matches!(
            realtime_url("ftp://example.com", &credential()),
            Err(ConsoleError::InvalidUrl { .. })
        ));
        assert!(realtime_url("not a url", &credential()).is_err());
    }

    #[test]
    fn test_redacted_drops_token() {
        let url = realtime_url("https://example.com", &credential()).unwrap();
        assert_eq!(redacted(&url), "wss://example.com/ws");
    }

    #[test]
    fn test_event_sink_stamps_generation() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        let sink = EventSink::new(9, move |generation, event| {
            recorded.lock().unwrap().push((generation, event));
            true
        });

        assert!(sink.frame("pong"));
        assert!(sink.closed(1006, "gone"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (9, SocketEvent::Frame("pong".into())),
                (
                    9,
                    SocketEvent::Closed {
                        code: 1006,
                        reason: "gone".into()
                    }
                ),
            ]
        );
    }
}
