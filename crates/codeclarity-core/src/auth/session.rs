use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{AuthError, CredentialStore, TokenPair};
use crate::api::ApiError;
use crate::models::AuthTokens;

/// Buffer time before access expiry to trigger refresh (5 minutes)
pub const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Source of the current time, injected so expiry checks are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Exchanges a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ApiError>;
}

/// Credentials in effect for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Token supplied through the environment. Never expires, never refreshed.
    Direct { token: String },
    /// Tokens loaded from the credential store.
    Stored(TokenPair),
}

/// Hands out a valid access token, refreshing the stored pair when it is
/// close to expiry.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    api_key: Option<String>,
}

impl SessionManager {
    /// `api_key` is the environment override; an empty key counts as unset.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            store,
            refresher,
            clock: Arc::new(SystemClock),
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The session in effect, without refreshing anything.
    pub fn session(&self) -> Result<Session, AuthError> {
        if let Some(ref token) = self.api_key {
            return Ok(Session::Direct {
                token: token.clone(),
            });
        }
        self.store.load().map(Session::Stored)
    }

    /// Return an access token that is valid for at least the refresh buffer.
    ///
    /// The environment override is returned as is and the store is never
    /// consulted. Otherwise the stored pair is checked against the clock:
    /// an expired refresh token ends the session, and an access token that
    /// expires within the buffer is exchanged once and the whole new pair
    /// persisted before it is returned.
    pub async fn acquire_token(&self) -> Result<String, AuthError> {
        if let Some(ref token) = self.api_key {
            return Ok(token.clone());
        }

        let tokens = self.store.load()?;
        let now = self.clock.now();

        if tokens.is_refresh_expired(now) {
            debug!(refresh_expiry = %tokens.refresh_expiry, "Refresh token expired");
            return Err(AuthError::SessionExpired);
        }

        if !tokens.access_expires_within(now, Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES)) {
            return Ok(tokens.access_token);
        }

        info!(access_expiry = %tokens.access_expiry, "Access token expiring, refreshing");
        let fresh = self
            .refresher
            .refresh(&tokens.refresh_token)
            .await
            .map_err(|e| AuthError::RefreshFailed(Box::new(e)))?;

        let rotated = tokens.rotated(fresh);
        self.store.save(&rotated)?;
        info!(access_expiry = %rotated.access_expiry, "Refreshed and saved access token");

        Ok(rotated.access_token)
    }
}
