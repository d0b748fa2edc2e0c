//! login, logout, status and whoami.

use anyhow::{Context as _, Result};
use clap::Args;
use dialoguer::Input;
use serde_json::json;
use tracing::info;

use codeclarity_core::api::Transport;
use codeclarity_core::auth::{AuthError, Session, TokenPair};
use codeclarity_core::config::{Config, ENV_API_KEY};
use codeclarity_core::{ApiClient, CredentialStore};

use super::Context;
use crate::output::{self, print_fields, print_json};

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    pub email: Option<String>,

    /// Account password (prefer the interactive prompt)
    #[arg(short, long)]
    pub password: Option<String>,

    /// API base URL, saved for later commands
    #[arg(long = "api-url")]
    pub api_url: Option<String>,
}

fn prompt_email() -> Result<String> {
    let email: String = Input::new()
        .with_prompt("Email")
        .interact_text()
        .context("Failed to read email")?;
    Ok(email.trim().to_string())
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

pub async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    let mut config = Config::load(&ctx.settings.config_dir).context("Failed to load config")?;
    let base_url = args
        .api_url
        .clone()
        .unwrap_or_else(|| ctx.settings.base_url.clone());

    let email = match args.email {
        Some(email) => email,
        None => prompt_email()?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let client = ApiClient::new(Transport::new(&base_url, ctx.settings.allow_insecure)?);
    let tokens = client
        .authenticate(&email, &password)
        .await
        .context("Authentication failed")?;
    let user = client
        .current_user_with_token(&tokens.token)
        .await
        .context("Failed to get user info")?;

    let pair = TokenPair::new(tokens, user.id.clone(), user.email.clone());
    ctx.store().save(&pair).context("Failed to save credentials")?;
    info!(user = %user.email, "Logged in");

    let mut config_changed = false;
    if let Some(org_id) = user.default_org_id() {
        config.default_org_id = Some(org_id.to_string());
        config_changed = true;
    }
    if let Some(ref url) = args.api_url {
        config.api_base_url = url.clone();
        config_changed = true;
    }
    if config_changed {
        if let Err(e) = config.save(&ctx.settings.config_dir) {
            output::warning(format!("Failed to save configuration: {}", e));
        }
    }

    output::success(format!("Logged in as {}", user.email));
    if args.api_url.is_some() {
        output::info(format!("API URL: {}", base_url));
    }
    if let Some(org_id) = user.default_org_id() {
        output::info(format!("Default organization: {}", org_id));
    }
    if ctx.settings.api_key.is_some() {
        output::warning(format!(
            "{} is set and takes precedence over the stored login",
            ENV_API_KEY
        ));
    }
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.store().clear().context("Failed to remove credentials")?;
    output::success("Logged out");
    Ok(())
}

pub fn status(ctx: &Context) -> Result<()> {
    let sessions = ctx.sessions()?;
    let now = sessions.now();

    let session = match sessions.session() {
        Ok(session) => session,
        Err(AuthError::NotAuthenticated) => {
            if ctx.format.is_json() {
                return print_json(&json!({ "authenticated": false }));
            }
            output::warning("Not logged in. Run 'codeclarity login'");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read credentials"),
    };

    match session {
        Session::Direct { .. } => {
            if ctx.format.is_json() {
                return print_json(&json!({
                    "authenticated": true,
                    "source": "environment",
                    "api_url": ctx.settings.base_url,
                }));
            }
            output::success(format!("Authenticated with {}", ENV_API_KEY));
            print_fields(&[("API URL", ctx.settings.base_url.clone())]);
        }
        Session::Stored(pair) => {
            if ctx.format.is_json() {
                return print_json(&json!({
                    "authenticated": !pair.is_refresh_expired(now),
                    "source": "credentials",
                    "email": pair.email,
                    "user_id": pair.user_id,
                    "api_url": ctx.settings.base_url,
                    "organization": ctx.settings.org_id,
                    "token_expiry": pair.access_expiry,
                    "refresh_token_expiry": pair.refresh_expiry,
                }));
            }

            if pair.is_refresh_expired(now) {
                output::warning("Session expired. Run 'codeclarity login' again");
                return Ok(());
            }

            let access = if now >= pair.access_expiry {
                "expired, refreshed on next request".to_string()
            } else {
                format!("{} minutes", pair.minutes_until_access_expiry(now))
            };
            output::success(format!("Logged in as {}", pair.email));
            print_fields(&[
                ("API URL", ctx.settings.base_url.clone()),
                (
                    "Organization",
                    ctx.settings.org_id.clone().unwrap_or_else(|| "-".to_string()),
                ),
                ("Access token", access),
                (
                    "Session",
                    format!("{} hours remaining", pair.hours_until_refresh_expiry(now)),
                ),
            ]);
        }
    }
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let user = ctx
        .client()?
        .current_user()
        .await
        .context("Failed to get user info")?;

    if ctx.format.is_json() {
        return print_json(&user);
    }

    let org = user
        .default_org
        .as_ref()
        .filter(|org| !org.id.is_empty())
        .map(|org| {
            if org.name.is_empty() {
                org.id.clone()
            } else {
                format!("{} ({})", org.name, org.id)
            }
        })
        .unwrap_or_else(|| "-".to_string());

    print_fields(&[
        ("Email", user.email.clone()),
        ("Name", output::or_empty(&user.full_name())),
        ("Handle", output::or_empty(&user.handle)),
        ("User ID", user.id.clone()),
        ("Organization", org),
    ]);
    Ok(())
}
