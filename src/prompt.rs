//! Terminal fallback for configuration values left empty.

use anyhow::Context;
use inquire::{Password, PasswordDisplayMode, Text};
use tracing::info;

use crate::crawler::fetcher::Credentials;

/// Target user names are matched lower-case and without surrounding blanks.
pub fn normalize_user(user: &str) -> String {
    user.trim().to_lowercase()
}

pub fn resolve_credentials(username: &str, password: &str) -> anyhow::Result<Credentials> {
    let username = if username.is_empty() {
        Text::new("Moviepilot login:")
            .prompt()
            .context("failed to read login")?
    } else {
        username.to_string()
    };

    let password = if password.is_empty() {
        Password::new("Moviepilot password:")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .context("failed to read password")?
    } else {
        password.to_string()
    };

    Ok(Credentials { username, password })
}

pub fn resolve_target_user(configured: &str) -> anyhow::Result<String> {
    let configured = normalize_user(configured);
    if !configured.is_empty() {
        return Ok(configured);
    }

    let entered = Text::new("Enter the moviepilot username you want to export ratings for:")
        .prompt()
        .context("failed to read target user")?;
    let user = normalize_user(&entered);
    info!(%user, "Target user entered");

    Ok(user)
}
