//! Authentication state and the session that owns the realtime connection.
//!
//! The persisted state is tiny: whether the operator is logged in and the
//! bearer token they logged in with. It lives in `auth_state.json` next to
//! the config file, is read once when the session opens and rewritten on
//! every change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{ConsoleError, Result};
use crate::notice::{self, Notice, NoticeSender};
use crate::realtime::{Connector, RealtimeManager, WsConnector};

/// File name of the persisted auth state inside the config directory.
pub const AUTH_STATE_FILE: &str = "auth_state.json";

/// Bearer token issued by the API. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for request headers and the handshake URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Token with everything but the first few characters masked.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}…", prefix)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

/// Persisted login state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Whether the operator is logged in
    pub is_authenticated: bool,
    /// Token issued at login
    pub access_token: Option<String>,
}

impl AuthState {
    /// Logged-in state for `credential`.
    pub fn authenticated(credential: &Credential) -> Self {
        Self {
            is_authenticated: true,
            access_token: Some(credential.as_str().to_string()),
        }
    }

    /// Credential to use, if logged in with a usable token.
    pub fn credential(&self) -> Option<Credential> {
        if !self.is_authenticated {
            return None;
        }
        self.access_token
            .as_deref()
            .map(Credential::new)
            .filter(|c| !c.is_blank())
    }
}

/// File-backed storage for [`AuthState`].
#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location (~/.config/modconsole/auth_state.json)
    pub fn default_path() -> Option<PathBuf> {
        Config::config_dir().map(|dir| dir.join(AUTH_STATE_FILE))
    }

    /// Store at the default location.
    pub fn open_default() -> Result<Self> {
        Self::default_path()
            .map(Self::new)
            .ok_or(ConsoleError::NoConfigDir)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved state. `Ok(None)` if nothing was saved yet.
    pub fn read(&self) -> Result<Option<AuthState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| ConsoleError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Replace the saved state.
    pub fn write(&self, state: &AuthState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, contents).map_err(|e| ConsoleError::FileWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Delete the saved state, if any.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConsoleError::FileWrite {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Login state plus the realtime connection that goes with it.
///
/// At most one [`RealtimeManager`] exists per session. Logging in replaces
/// it; logging out cleans it up and stops it.
pub struct Session {
    store: AuthStore,
    state: AuthState,
    config: Config,
    connector: Arc<dyn Connector>,
    notices: NoticeSender,
    realtime: Option<RealtimeManager>,
    pending_connect: Option<JoinHandle<()>>,
}

impl Session {
    /// Open a session, restoring any saved state from `store`.
    pub fn open(store: AuthStore, config: Config, notices: NoticeSender) -> Self {
        Self::with_connector(store, config, Arc::new(WsConnector), notices)
    }

    /// Like [`open`](Self::open) with a custom realtime transport.
    pub fn with_connector(
        store: AuthStore,
        config: Config,
        connector: Arc<dyn Connector>,
        notices: NoticeSender,
    ) -> Self {
        let state = match store.read() {
            Ok(Some(state)) => state,
            Ok(None) => AuthState::default(),
            Err(e) => {
                log::warn!("[Session] Discarding unreadable auth state: {}", e);
                notice::publish(
                    &notices,
                    Notice::StateLoadFailed {
                        reason: e.to_string(),
                    },
                );
                if let Err(e) = store.remove() {
                    log::warn!("[Session] Could not remove auth state: {}", e);
                }
                AuthState::default()
            }
        };

        Self {
            store,
            state,
            config,
            connector,
            notices,
            realtime: None,
            pending_connect: None,
        }
    }

    /// Current login state.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Whether a usable credential is held.
    pub fn is_authenticated(&self) -> bool {
        self.state.credential().is_some()
    }

    /// Credential for REST calls, if logged in.
    pub fn credential(&self) -> Option<Credential> {
        self.state.credential()
    }

    /// Configuration the session was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Live realtime manager, if logged in and started.
    pub fn realtime(&self) -> Option<&RealtimeManager> {
        self.realtime.as_ref()
    }

    /// Record a new login and start its realtime connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn login(&mut self, credential: Credential) -> Result<&RealtimeManager> {
        self.remember(&credential)?;
        Ok(self.start_realtime(credential))
    }

    /// Record a new login without starting the realtime connection.
    ///
    /// Any running connection belongs to the previous credential and is
    /// stopped. [`resume`](Self::resume) starts a new one.
    pub fn remember(&mut self, credential: &Credential) -> Result<()> {
        if credential.is_blank() {
            return Err(ConsoleError::EmptyToken);
        }
        self.stop_realtime();
        self.state = AuthState::authenticated(credential);
        self.persist();
        log::info!("[Session] Logged in");
        Ok(())
    }

    /// Start the realtime connection for a restored login.
    ///
    /// Returns `None` when no usable credential was saved.
    pub fn resume(&mut self) -> Option<&RealtimeManager> {
        let credential = self.state.credential()?;
        Some(self.start_realtime(credential))
    }

    /// Tear down the realtime connection and forget the credential.
    pub fn logout(&mut self) {
        self.stop_realtime();
        self.state = AuthState::default();
        self.persist();
        log::info!("[Session] Logged out");
    }

    fn start_realtime(&mut self, credential: Credential) -> &RealtimeManager {
        self.stop_realtime();

        let manager = RealtimeManager::with_connector(
            credential,
            self.config.api_base_url.clone(),
            self.config.realtime.clone(),
            Arc::clone(&self.connector),
            self.notices.clone(),
        );

        let delay = self.config.realtime.initial_connect_delay();
        let delayed = manager.clone();
        self.pending_connect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            delayed.connect();
        }));

        self.realtime.insert(manager)
    }

    fn stop_realtime(&mut self) {
        if let Some(pending) = self.pending_connect.take() {
            pending.abort();
        }
        if let Some(manager) = self.realtime.take() {
            manager.shutdown();
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.write(&self.state) {
            log::error!("[Session] Failed to save auth state: {}", e);
            notice::publish(
                &self.notices,
                Notice::StateSaveFailed {
                    reason: e.to_string(),
                },
            );
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_realtime();
    }
}
