//! Operator-facing notices.
//!
//! Most failures are handled where they happen. The ones below need a human:
//! they are pushed onto an unbounded channel that the front end drains and
//! shows however it likes.

use std::time::Duration;

use tokio::sync::mpsc;

/// Sending half of the notice channel.
pub type NoticeSender = mpsc::UnboundedSender<Notice>;

/// Receiving half of the notice channel.
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Create a notice channel.
pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

/// Push `notice` to the front end. Returns false if nobody is listening.
pub fn publish(sender: &NoticeSender, notice: Notice) -> bool {
    if let Err(e) = sender.send(notice) {
        log::debug!("[Notice] Receiver dropped; discarding: {}", e.0);
        return false;
    }
    true
}

/// A condition the operator should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Server refused the session: too many active sessions
    ConnectionLimitReached,
    /// Automatic retries used up; a new cycle starts after `retry_in`
    ReconnectExhausted {
        /// Exhausted cycles so far
        cycle: u32,
        /// Cool-down before the next cycle
        retry_in: Duration,
    },
    /// Automatic retries stopped; a manual connect is required
    ReconnectAbandoned,
    /// Realtime endpoint could not be derived from the configuration
    RealtimeMisconfigured {
        /// Error description
        reason: String,
    },
    /// Saved session could not be read; starting logged out
    StateLoadFailed {
        /// Error description
        reason: String,
    },
    /// Session could not be saved
    StateSaveFailed {
        /// Error description
        reason: String,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ConnectionLimitReached => write!(
                f,
                "Connection limit reached. Please close other sessions before continuing."
            ),
            Notice::ReconnectExhausted { retry_in, .. } => write!(
                f,
                "Unable to establish connection. Retrying in {}s.",
                retry_in.as_secs()
            ),
            Notice::ReconnectAbandoned => write!(
                f,
                "Unable to establish connection. Reconnect manually to try again."
            ),
            Notice::RealtimeMisconfigured { reason } => {
                write!(f, "Realtime connection is misconfigured: {}", reason)
            }
            Notice::StateLoadFailed { reason } => write!(
                f,
                "Error loading saved authentication state ({}). Please login again.",
                reason
            ),
            Notice::StateSaveFailed { reason } => write!(
                f,
                "Failed to save authentication state ({}). You may need to login again.",
                reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reports_dropped_receiver() {
        let (tx, mut rx) = channel();
        assert!(publish(&tx, Notice::ConnectionLimitReached));
        assert_eq!(rx.try_recv(), Ok(Notice::ConnectionLimitReached));

        drop(rx);
        assert!(!publish(&tx, Notice::ReconnectAbandoned));
    }
}
