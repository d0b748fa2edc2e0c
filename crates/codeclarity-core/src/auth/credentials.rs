//! Persistent token storage.
//!
//! Tokens live in `<config dir>/credentials.json`. The file is replaced as
//! a whole on every save (temp file, fsync, rename) and is only ever
//! readable by its owner on Unix.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::AuthError;
use crate::models::AuthTokens;

/// Credentials file name in the config directory
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// File permissions for the credentials file (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Access and refresh tokens for the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "token_expiry")]
    pub access_expiry: DateTime<Utc>,
    #[serde(rename = "refresh_token_expiry")]
    pub refresh_expiry: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

impl TokenPair {
    pub fn new(tokens: AuthTokens, user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            access_token: tokens.token,
            refresh_token: tokens.refresh_token,
            access_expiry: tokens.token_expiry,
            refresh_expiry: tokens.refresh_token_expiry,
            user_id: user_id.into(),
            email: email.into(),
        }
    }

    /// Replace both tokens and both expiries, keeping the user identity.
    pub fn rotated(&self, tokens: AuthTokens) -> Self {
        Self::new(tokens, self.user_id.clone(), self.email.clone())
    }

    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_expiry
    }

    /// True once `now` is within `buffer` of the access expiry, or past it.
    pub fn access_expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now >= self.access_expiry || now + buffer >= self.access_expiry
    }

    /// Minutes until the access token expires (for display)
    pub fn minutes_until_access_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.access_expiry - now).num_minutes().max(0)
    }

    /// Hours until the refresh token expires (for display)
    pub fn hours_until_refresh_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.refresh_expiry - now).num_hours().max(0)
    }
}

/// Where the token pair is kept between invocations.
pub trait CredentialStore: Send + Sync {
    /// Load the stored pair. A missing pair is `AuthError::NotAuthenticated`.
    fn load(&self) -> Result<TokenPair, AuthError>;

    fn save(&self, tokens: &TokenPair) -> Result<(), AuthError>;

    /// Remove the stored pair. Removing nothing is not an error.
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ensure the storage directory exists with correct permissions.
    fn ensure_dir(&self) -> Result<(), AuthError> {
        if self.dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AuthError::Storage(format!(
                "Failed to create config directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(DIR_MODE))
                .map_err(|e| {
                    AuthError::Storage(format!(
                        "Failed to set directory permissions on '{}': {}",
                        self.dir.display(),
                        e
                    ))
                })?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self))]
    fn load(&self) -> Result<TokenPair, AuthError> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::NotAuthenticated)
            }
            Err(e) => {
                return Err(AuthError::Storage(format!(
                    "Failed to read credentials file '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Err(AuthError::NotAuthenticated);
        }

        serde_json::from_str(&content).map_err(|e| {
            AuthError::Storage(format!(
                "Failed to parse credentials file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    #[instrument(skip(self, tokens))]
    fn save(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        self.ensure_dir()?;

        let path = self.path();
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize credentials: {}", e)))?;

        // Unique temp file per save; concurrent writers each rename a complete file.
        let mut temp = tempfile::Builder::new()
            .prefix(".credentials")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| AuthError::Storage(format!("Failed to create temp file: {}", e)))?;

        let write_result = {
            use std::io::Write;

            #[cfg(unix)]
            let restricted = {
                use std::os::unix::fs::PermissionsExt;
                temp.as_file()
                    .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
            };
            #[cfg(not(unix))]
            let restricted: std::io::Result<()> = Ok(());

            restricted
                .and_then(|()| temp.write_all(content.as_bytes()))
                .and_then(|()| temp.as_file().sync_all())
        };
        if let Err(e) = write_result {
            return Err(AuthError::Storage(format!(
                "Failed to write temp file '{}': {}",
                temp.path().display(),
                e
            )));
        }

        temp.persist(&path).map_err(|e| {
            AuthError::Storage(format!(
                "Failed to replace '{}': {}",
                path.display(),
                e.error
            ))
        })?;

        debug!(path = %path.display(), "Saved credentials");
        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<(), AuthError> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "Failed to remove credentials file '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

/// In-process credential store that never touches disk.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<TokenPair>>, AuthError> {
        self.tokens
            .lock()
            .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<TokenPair, AuthError> {
        self.lock()?.clone().ok_or(AuthError::NotAuthenticated)
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        *self.lock()? = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.lock()? = None;
        Ok(())
    }
}
