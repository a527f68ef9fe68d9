mod api;
mod auth;
mod cli;
mod commands;
mod config;
mod context;
mod error;
mod format;
mod logging;
mod output;
mod response;
mod workspace;

use auth::CredentialStore;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use context::Ctx;
use error::{CliError, ExitCode, Result};
use response::StdinPrompt;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => ExitCode::Success.code(),
        Err(err) => error::report(&err),
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let store = CredentialStore::from_flags(cli.no_keychain);

    let command = match cli.command {
        Commands::Auth { command } => return commands::auth::run(command, store).await,
        Commands::Config { command } => return commands::config::run(command),
        other => other,
    };

    let config = Config::load()?;
    let resolved = store.resolve(&config).map_err(|e| {
        tracing::debug!("credential lookup failed: {}", e);
        CliError::MissingCredentials
    })?;
    tracing::debug!(source = %resolved.source, server = %resolved.credentials.api_url, "using credentials");
    let ctx = Ctx::new(resolved.credentials, config, Box::new(StdinPrompt))?;

    match command {
        Commands::Workspace { command } => commands::workspace::run(command, &ctx).await,
        Commands::User { command } => commands::user::run(command, &ctx).await,
        Commands::Comment { command } => commands::comment::run(command, &ctx).await,
        Commands::Asset { command } => commands::asset::run(command, &ctx).await,
        Commands::System { command } => commands::system::run(command, &ctx).await,
        Commands::Tag { command } => commands::tag::run(command, &ctx).await,
        Commands::Testmonitor { command } => commands::testmonitor::run(command, &ctx).await,
        Commands::Workitem { command } => commands::workitem::run(command, &ctx).await,
        Commands::Notebook { command } => commands::notebook::run(command, &ctx).await,
        Commands::Routine { command } => commands::routine::run(command, &ctx).await,
        Commands::Feed { command } => commands::feed::run(command, &ctx).await,
        Commands::Dff { command } => commands::dff::run(command, &ctx).await,
        Commands::File { command } => commands::file::run(command, &ctx).await,
        Commands::Auth { .. } | Commands::Config { .. } => Ok(()),
    }
}
