#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Configuration options
pub mod config;

/// Error (common error types)
pub mod error;

/// Operator-facing notices
pub mod notice;

/// Credential, persisted login state and the session
pub mod auth;

/// REST client for the public and admin APIs
pub mod api;

/// Admin API data types
pub mod model;

/// Realtime channel: connection manager, heartbeat, reconnection, routing
pub mod realtime;

#[cfg(test)]
pub mod test_utils;
