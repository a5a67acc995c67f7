//! Session token storage and retrieval.
//!
//! Stores the access/refresh token pair in `<base>/session.json` with
//! restricted permissions (0600). Tokens are never logged or displayed in full.

mod guard;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use guard::{GuardDecision, SessionGuard};

use crate::config::paths;

/// Credentials for the signed-in donor.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Short-lived access token sent with every authenticated request
    pub access_token: Option<String>,
    /// Long-lived refresh token. Persisted, never exchanged.
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }

    /// Returns the access token if one is present and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .finish()
    }
}

/// On-disk layout. `authToken` is what the opaque-token login flow wrote.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, rename = "authToken", skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            access_token: stored.access_token.or(stored.auth_token),
            refresh_token: stored.refresh_token,
        }
    }
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            auth_token: None,
        }
    }
}

/// Process-wide owner of the [`Session`].
///
/// Cloning yields another handle to the same session. Every write fully
/// replaces the value and is persisted before the call returns.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: Option<PathBuf>,
    current: RwLock<Session>,
}

impl TokenStore {
    /// Opens the store backed by the default session file.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be read or parsed.
    pub fn open_default() -> Result<Self> {
        Self::open(paths::session_path())
    }

    /// Opens the store backed by `path`. A missing file means no session.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let session = load_session(&path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                path: Some(path),
                current: RwLock::new(session),
            }),
        })
    }

    /// Creates a store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::in_memory_with(Session::default())
    }

    pub fn in_memory_with(session: Session) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: None,
                current: RwLock::new(session),
            }),
        }
    }

    /// Returns the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn get(&self) -> Session {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().access_token().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_authenticated()
    }

    /// Replaces the session and persists it.
    ///
    /// # Errors
    /// Returns an error if the session file cannot be written. The in-memory
    /// value is replaced either way.
    pub fn set(&self, session: Session) -> Result<()> {
        let persisted = StoredSession::from(&session);
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;

        match &self.inner.path {
            Some(path) => save_session(path, &persisted),
            None => Ok(()),
        }
    }

    /// Drops the session and removes the session file.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be removed.
    /// The in-memory value is cleared either way.
    pub fn clear(&self) -> Result<()> {
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Session::default();

        let Some(path) = &self.inner.path else {
            return Ok(());
        };
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove session file {}", path.display()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("path", &self.inner.path)
            .field("session", &self.get())
            .finish()
    }
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Ok(Session::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Session::default());
    }

    let stored: StoredSession = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse session from {}", path.display()))?;
    Ok(stored.into())
}

fn save_session(path: &Path, stored: &StoredSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(stored).context("Failed to serialize session")?;

    // Write with restricted permissions
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}
