//! Authentication: token storage and session management.
//!
//! This module provides:
//! - `CredentialStore`: persistence for the access/refresh token pair
//! - `SessionManager`: hands out access tokens, refreshing them shortly
//!   before they expire
//!
//! `CODECLARITY_API_KEY` bypasses both: when set, its value is used as the
//! bearer token and nothing is read from or written to the store.

pub mod credentials;
pub mod error;
pub mod session;

pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenPair};
pub use error::AuthError;
pub use session::{
    Clock, Session, SessionManager, SystemClock, TokenRefresher, TOKEN_REFRESH_BUFFER_MINUTES,
};
