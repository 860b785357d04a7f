use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for moderation console operations
#[derive(Debug, Error)]
pub enum ConsoleError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Unknown config key '{0}'")]
    UnknownConfigKey(String),

    #[error("Invalid value '{value}' for '{key}'")]
    InvalidConfigValue { key: String, value: String },

    // Request layer errors
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Response did not contain an access token")]
    MissingToken,

    #[error("Access token is empty")]
    EmptyToken,

    #[error("Not logged in. Run 'modconsole login <phone>' first.")]
    NotLoggedIn,

    // Realtime errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Realtime connection is closed")]
    ConnectionClosed,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    // Argument errors
    #[error("Invalid rotation {0}. Expected one of 0, 90, 180, 270")]
    InvalidRotation(u16),

    #[error("Invalid trim range: start {start}s must be before end {end}s")]
    InvalidTrimRange { start: f64, end: f64 },

    #[error("Unknown {kind} '{value}'")]
    UnknownCode { kind: &'static str, value: String },
}

/// Result type alias for moderation console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    /// Whether the error came from the server rejecting the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Http { status, .. } if *status == 401 || *status == 403)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_credential_is_unauthorized() {
        let http = |status| ConsoleError::Http {
            status,
            body: String::new(),
        };
        assert!(http(401).is_unauthorized());
        assert!(http(403).is_unauthorized());
        assert!(!http(500).is_unauthorized());
        assert!(!ConsoleError::NotLoggedIn.is_unauthorized());
    }
}
