//! Core library for the CodeClarity command-line client.
//!
//! - `api`: transport, envelope decoding and typed endpoint methods
//! - `auth`: credential storage and token refresh
//! - `config`: persisted config and per-invocation settings
//! - `models`: wire types
//! - `poller`: watch a resource until it reaches a terminal state

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod poller;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, CredentialStore, FileCredentialStore, SessionManager};
pub use config::{Config, ConfigError, Settings};
pub use poller::{Outcome, PollError, Polled};
