//! Credential storage and identity derivation.
//!
//! The store is the only durable client-side state: an access/refresh token
//! pair, written as JSON under the platform config directory (or any injected
//! path). It is shared process-wide; every [`crate::Client`] and channel in
//! the authenticated area reads the same store, and a credential rotation by
//! one caller is immediately visible to the rest.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use directories::ProjectDirs;
use gamba_types::Tokens;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<Tokens> for Credentials {
    fn from(tokens: Tokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Claims embedded in the access token.
///
/// Decoded without verification, purely so the UI can tell who is logged in
/// and whether to show admin surfaces. Enforcement stays on the server.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Identity {
    /// Whether the claims carry an unexpired admin role.
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
            && self.exp.is_some_and(|exp| exp > Utc::now().timestamp())
    }
}

/// Process-wide credential store.
///
/// Clones share state. Mutation happens under a lock so a refresh observed by
/// one in-flight request is seen by every other caller.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Credentials>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// A store that never touches disk. Used by tests and embedders that
    /// manage persistence themselves.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            path: None,
        }
    }

    /// The default persistent store under the platform config directory,
    /// loading any previously saved session.
    pub fn open() -> Self {
        let path = ProjectDirs::from("xyz", "gamba", "gamba-client")
            .map(|dirs| dirs.config_dir().join("session.json"));
        match path {
            Some(path) => Self::with_path(path),
            None => Self::in_memory(),
        }
    }

    /// A persistent store at an explicit path, loading any saved session.
    pub fn with_path(path: PathBuf) -> Self {
        let loaded = load_credentials(&path);
        Self {
            inner: Arc::new(RwLock::new(loaded)),
            path: Some(path),
        }
    }

    /// Install a credential pair (login, register, or refresh) and persist it.
    pub fn set(&self, credentials: Credentials) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(credentials.clone());
        }
        if let Some(path) = &self.path {
            if let Err(err) = save_credentials(path, &credentials) {
                warn!(error = %err, "failed to persist session");
            }
        }
    }

    /// Tear down the session: drop the credentials and delete the saved file.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(err) = std::fs::remove_file(path) {
                    warn!(error = %err, "failed to delete saved session");
                }
            }
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.inner.read().ok()?.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        Some(self.credentials()?.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        Some(self.credentials()?.refresh_token)
    }

    /// The identity embedded in the current access token, or `None` when
    /// logged out or the token is malformed. Absence means unauthenticated;
    /// it never raises.
    pub fn current_identity(&self) -> Option<Identity> {
        decode_claims(&self.access_token()?)
    }
}

/// Decode the claims segment of a JWT without verifying the signature.
/// Any structural problem yields `None`.
fn decode_claims(token: &str) -> Option<Identity> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn load_credentials(path: &PathBuf) -> Option<Credentials> {
    let data = std::fs::read(path).ok()?;
    serde_json::from_slice(&data).ok()
}

fn save_credentials(path: &PathBuf, credentials: &Credentials) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let data = serde_json::to_vec_pretty(credentials)?;
    std::fs::write(path, data)
}
