mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use commands::config::{ConfigCommand, SetupContext};
use commands::utils::JiraContext;
use commands::Command;
use jira_ops_auth::{token_key, CredentialStore};
use jira_ops_client::JiraOperations;
use jira_ops_config::{read_env_file, Config, Credentials};
use jira_ops_output::{OutputFormat, OutputRenderer};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "jira-ops", version, about = "Everyday Jira Cloud operations", long_about = None)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.jira-ops/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read JIRA_* settings from a KEY=VALUE file
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Jira site URL (e.g. https://your-domain.atlassian.net)
    #[arg(long, env = "JIRA_BASE_URL")]
    base_url: Option<String>,

    /// Account email used with the API token
    #[arg(long, env = "JIRA_USERNAME")]
    username: Option<String>,

    /// Jira API token
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.debug) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        profile,
        config: config_path,
        env_file,
        base_url,
        username,
        api_token,
        output,
        command,
        ..
    } = cli;

    let renderer = OutputRenderer::new(output);
    let mut config = Config::load(config_path.as_ref())?;
    let store = CredentialStore::new()?;

    let from_flags = Credentials::new(
        base_url.or_else(|| std::env::var("JIRA_URL").ok()),
        username,
        api_token,
    );

    // Commands that never talk to Jira.
    let command = match command {
        Command::Config(ConfigCommand::Setup(args)) => {
            let ctx = SetupContext {
                config: &mut config,
                config_path: config_path.as_deref(),
                store: &store,
                profile: profile.as_deref().unwrap_or("default"),
                defaults: from_flags,
                renderer: &renderer,
            };
            return commands::config::setup(args, ctx);
        }
        Command::Template(args) => return commands::import::write_template(&args, &renderer),
        Command::Import(args) if args.dry_run => {
            return commands::import::preview(&args, &renderer);
        }
        command => command,
    };

    let (profile_name, credentials) = resolve_credentials(
        from_flags,
        env_file.as_deref(),
        &config,
        profile.as_deref(),
        &store,
    )?;

    if let Command::Config(ConfigCommand::Show) = command {
        let path = config_path.unwrap_or_else(Config::default_path);
        return commands::config::show(profile_name.as_deref(), &credentials, &path, &renderer);
    }

    let Credentials {
        base_url,
        username,
        api_token,
    } = credentials;
    let mut jira = JiraOperations::new(
        base_url.unwrap_or_default(),
        username.unwrap_or_default(),
        api_token.unwrap_or_default(),
    );

    if !jira.connect().await {
        return Ok(ExitCode::FAILURE);
    }

    let ctx = JiraContext {
        jira: &jira,
        renderer: &renderer,
    };
    let result = commands::execute(command, &ctx).await;
    jira.disconnect();
    result
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,jira_ops=debug,jira_ops_client=debug,jira_ops_api=debug,jira_ops_bulk=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

/// Layers connection settings: flags and environment, then the env file, then
/// the selected profile, then the token stored for that profile.
fn resolve_credentials(
    from_flags: Credentials,
    env_file: Option<&Path>,
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
) -> Result<(Option<String>, Credentials)> {
    let from_env_file = match env_file {
        Some(path) => Credentials::from_env_map(&read_env_file(path)?),
        None => Credentials::default(),
    };

    let (profile_name, from_profile) = match config.resolve_profile(requested) {
        Some((name, profile)) => (Some(name.to_string()), Credentials::from_profile(profile)),
        None => {
            if let Some(name) = requested {
                return Err(anyhow!(
                    "Profile '{name}' not found. Run `jira-ops --profile {name} config setup` first."
                ));
            }
            (None, Credentials::default())
        }
    };

    let mut credentials = from_flags.or(from_env_file).or(from_profile);
    if credentials.api_token.is_none() {
        if let Some(name) = profile_name.as_deref() {
            let stored = store
                .get_secret(&token_key(name))
                .with_context(|| format!("Failed to read stored token for profile '{name}'"))?;
            credentials = credentials.with_token_fallback(stored);
        }
    }

    Ok((profile_name, credentials))
}
