//! AuthDesk - desktop sign-in host
//!
//! `authdesk [login]` signs in (silently when a refresh token is stored);
//! `authdesk logout` clears the stored token and visits the logout page
//! without attempting a sign-in first.

use std::sync::Arc;

use anyhow::{bail, Context};
use authdesk_app::{AppContext, ConsoleNavigator};
use authdesk_core::StartupMode;
use authdesk_infra::{init_tracing, LogFormat};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env());
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    let config = authdesk_infra::config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let command = std::env::args().nth(1);
    let startup = match command.as_deref() {
        None | Some("login") => StartupMode::SignIn,
        Some("logout") => StartupMode::Passive,
        Some(other) => bail!("unknown command `{other}` (expected `login` or `logout`)"),
    };
    let mut ctx = AppContext::new(config, Arc::new(ConsoleNavigator), startup)
        .context("failed to start authentication")?;

    let outcome = match startup {
        StartupMode::SignIn => {
            tokio::select! {
                result = ctx.consumer.await_result() => result.map(|logged_in| {
                    info!(logged_in, "Login finished");
                }).map_err(anyhow::Error::from),
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    Ok(())
                }
            }
        }
        StartupMode::Passive => ctx.logout().await.map_err(anyhow::Error::from),
    };

    ctx.shutdown().await;
    outcome
}
