//! Reconnection policy: what to do after a connection dies.
//!
//! Close codes split into three classes. Normal closure (1000) is terminal,
//! connection-limit (4001) is fatal and surfaced to the operator, and
//! everything else is transient and retried with exponential backoff:
//! `base * 2^attempt` for attempts `1..=max_attempts`.
//!
//! Once the attempts are used up the operator is told, the counter starts
//! over, and a fresh cycle begins after a cool-down. An optional cycle cap
//! turns that into a real give-up that waits for a manual connect.

use std::time::Duration;

use crate::config::RealtimeSettings;

/// Close code sent by `cleanup` and by servers ending a session cleanly.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported for transport failures without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Close code sent by the server when the operator has too many sessions.
pub const CLOSE_CONNECTION_LIMIT: u16 = 4001;

/// Classification of a close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Expected closure; nothing further happens
    Normal,
    /// Too many active sessions; never retried
    ConnectionLimit,
    /// Anything else; handed to the backoff policy
    Abnormal,
}

impl CloseKind {
    /// Classify a websocket close code.
    pub fn from_code(code: u16) -> Self {
        match code {
            CLOSE_NORMAL => CloseKind::Normal,
            CLOSE_CONNECTION_LIMIT => CloseKind::ConnectionLimit,
            _ => CloseKind::Abnormal,
        }
    }
}

/// What the worker should do after an abnormal closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule a connect after `delay`
    Retry {
        /// Attempt number within the current cycle (1-based)
        attempt: u32,
        /// Backoff before the attempt
        delay: Duration,
    },
    /// Attempts exhausted: notify, then start a fresh cycle after `cooldown`
    Restart {
        /// Pause before the first attempt of the new cycle
        cooldown: Duration,
        /// Number of cycles exhausted so far
        cycle: u32,
    },
    /// Cycle cap reached: notify and wait for a manual connect
    GiveUp,
}

/// Attempt counter with exponential backoff.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempt: u32,
    exhausted_cycles: u32,
    max_attempts: u32,
    base_delay: Duration,
    cooldown: Duration,
    max_cycles: Option<u32>,
}

impl ReconnectPolicy {
    /// Build a policy from the realtime settings.
    pub fn new(settings: &RealtimeSettings) -> Self {
        Self {
            attempt: 0,
            exhausted_cycles: 0,
            max_attempts: settings.max_reconnect_attempts,
            base_delay: settings.reconnect_base_delay(),
            cooldown: settings.exhausted_cooldown(),
            max_cycles: settings.max_reconnect_cycles,
        }
    }

    /// Current attempt counter.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Backoff before attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Decide what follows an abnormal closure.
    pub fn on_abnormal_close(&mut self) -> RetryDecision {
        if self.attempt < self.max_attempts {
            self.attempt += 1;
            return RetryDecision::Retry {
                attempt: self.attempt,
                delay: self.delay_for(self.attempt),
            };
        }

        self.attempt = 0;
        self.exhausted_cycles += 1;
        match self.max_cycles {
            Some(max) if self.exhausted_cycles >= max => {
                self.exhausted_cycles = 0;
                RetryDecision::GiveUp
            }
            _ => RetryDecision::Restart {
                cooldown: self.cooldown,
                cycle: self.exhausted_cycles,
            },
        }
    }

    /// A connection opened: start over.
    pub fn on_open(&mut self) {
        self.attempt = 0;
        self.exhausted_cycles = 0;
    }

    /// Forget all progress (explicit cleanup or logout).
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.exhausted_cycles = 0;
    }
}
