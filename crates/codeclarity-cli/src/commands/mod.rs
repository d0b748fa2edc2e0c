//! Command implementations.
//!
//! Each submodule owns one command group: its clap definitions and the
//! code that runs it against a shared `Context`.

pub mod analysis;
pub mod analyzer;
pub mod auth;
pub mod config;
pub mod project;
pub mod result;

use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use clap::Args;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use codeclarity_core::api::{Transport, DEFAULT_ENTRIES_PER_PAGE};
use codeclarity_core::auth::TokenRefresher;
use codeclarity_core::{ApiClient, FileCredentialStore, SessionManager, Settings};

use crate::output::OutputFormat;

/// Everything a command needs from the invocation.
pub struct Context {
    pub settings: Settings,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let format = OutputFormat::parse(&settings.output_format);
        Self { settings, format }
    }

    pub fn store(&self) -> Arc<FileCredentialStore> {
        Arc::new(FileCredentialStore::new(&self.settings.config_dir))
    }

    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::from_settings(&self.settings, self.store()).context("Failed to create API client")
    }

    /// Session resolution without a client, for reporting login state.
    pub fn sessions(&self) -> Result<SessionManager> {
        let transport = Transport::from_settings(&self.settings).context("Failed to create API client")?;
        let refresher: Arc<dyn TokenRefresher> = Arc::new(transport);
        Ok(SessionManager::new(
            self.store(),
            refresher,
            self.settings.api_key.clone(),
        ))
    }

    /// The organization to act on, from `--org` or the configured default.
    pub fn org_id(&self) -> Result<&str> {
        self.settings.org_id.as_deref().ok_or_else(|| {
            anyhow!(
                "Organization ID required. Use --org or set a default with 'codeclarity config set org <id>'"
            )
        })
    }
}

/// Cancels a token on Ctrl+C for as long as it is held.
///
/// Only installed around long waits that know how to stop; elsewhere
/// Ctrl+C keeps its default behaviour of ending the process.
pub struct InterruptGuard {
    task: JoinHandle<()>,
}

impl InterruptGuard {
    pub fn install(token: CancellationToken) -> Self {
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        Self { task }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Pagination flags shared by list commands.
#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    /// Page number (0-indexed)
    #[arg(long, default_value_t = 0)]
    pub page: u32,

    /// Results per page
    #[arg(long = "per-page", default_value_t = DEFAULT_ENTRIES_PER_PAGE)]
    pub per_page: u32,
}
