use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use jira_ops_auth::{token_key, CredentialStore};
use jira_ops_config::{Config, Credentials, Profile};
use jira_ops_output::OutputRenderer;
use serde::Serialize;
use url::Url;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Prompt for connection settings and save them as a profile
    Setup(SetupArgs),
    /// Show the settings that would be used to connect
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Make this profile the default one
    #[arg(long)]
    pub default: bool,
}

pub struct SetupContext<'a> {
    pub config: &'a mut Config,
    pub config_path: Option<&'a Path>,
    pub store: &'a CredentialStore,
    pub profile: &'a str,
    /// Values already given through flags or the environment; only the rest are prompted for.
    pub defaults: Credentials,
    pub renderer: &'a OutputRenderer,
}

pub fn setup(args: SetupArgs, ctx: SetupContext<'_>) -> Result<ExitCode> {
    let profile = ctx.profile.trim();
    if profile.is_empty() {
        bail!("Profile name cannot be empty");
    }

    let base_url = match ctx.defaults.base_url {
        Some(url) => url,
        None => prompt("Jira base URL (e.g. https://your-domain.atlassian.net): ")?,
    };
    let username = match ctx.defaults.username {
        Some(username) => username,
        None => prompt("Username/email: ")?,
    };
    let api_token = match ctx.defaults.api_token {
        Some(token) => token,
        None => rpassword::prompt_password("API token: ")
            .context("Failed to read token from prompt")?
            .trim()
            .to_string(),
    };

    if base_url.is_empty() || username.is_empty() || api_token.is_empty() {
        bail!("Base URL, username and API token are all required");
    }
    Url::parse(&base_url).with_context(|| format!("Invalid Jira site URL: {base_url}"))?;

    ctx.config.upsert_profile(
        profile,
        Profile {
            base_url: Some(base_url.trim_end_matches('/').to_string()),
            username: Some(username),
            api_token: None,
        },
    );
    if args.default {
        ctx.config.default_profile = Some(profile.to_string());
    }

    ctx.store
        .set_secret(&token_key(profile), &api_token)
        .context("Failed to store API token")?;
    let path = ctx
        .config
        .save(ctx.config_path)
        .context("Unable to persist configuration file")?;

    tracing::info!(profile, path = %path.display(), "Profile saved");
    ctx.renderer.success(format!(
        "Saved profile '{profile}' to {} (token in {})",
        path.display(),
        ctx.store.path().display()
    ));
    Ok(ExitCode::SUCCESS)
}

pub fn show(
    profile: Option<&str>,
    credentials: &Credentials,
    config_path: &Path,
    renderer: &OutputRenderer,
) -> Result<ExitCode> {
    #[derive(Serialize)]
    struct Row<'a> {
        profile: &'a str,
        base_url: &'a str,
        username: &'a str,
        api_token: String,
        config_file: String,
        configured: bool,
    }

    let row = Row {
        profile: profile.unwrap_or(""),
        base_url: credentials.base_url.as_deref().unwrap_or(""),
        username: credentials.username.as_deref().unwrap_or(""),
        api_token: credentials.masked_token().unwrap_or_default(),
        config_file: config_path.display().to_string(),
        configured: credentials.is_complete(),
    };
    renderer.render(&row)?;

    if credentials.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        renderer.notice(format!(
            "Missing {}. Set them in the environment or run: jira-ops config setup",
            credentials.missing().join(", ")
        ));
        Ok(ExitCode::FAILURE)
    }
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush().context("Failed to flush stderr")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_owned())
}
