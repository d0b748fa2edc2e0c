use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No stored credentials. Recoverable by logging in.
    #[error("Not authenticated: run 'codeclarity login'")]
    NotAuthenticated,

    #[error("Session expired: run 'codeclarity login' again")]
    SessionExpired,

    #[error("Failed to refresh access token: {0}")]
    RefreshFailed(#[source] Box<ApiError>),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Whether logging in again is the way out of this error.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::SessionExpired | AuthError::RefreshFailed(_)
        )
    }
}
