//! QuizShare CLI - share and take community quizzes from the terminal
//!
//! Works against a LAN quiz server when one is reachable and falls back to
//! quizzes saved on this device when it is not.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::cloud::run_cloud;
use crate::commands::common::{resolve_config_path, resolve_db_path, AppContext};
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::search::run_search;
use crate::commands::server::run_server;
use crate::commands::share::{run_share, ShareArgs};
use crate::commands::start::run_start;
use crate::commands::status::run_status;
use crate::commands::user::run_user;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "quizshare=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help().map_err(CliError::Io)?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path)?;
    let config_path = resolve_config_path(cli.config)?;
    let ctx = AppContext::open(&db_path, &config_path)?;

    match command {
        Commands::Share {
            file,
            title,
            description,
            user,
            json,
        } => {
            let args = ShareArgs {
                file: file.as_deref(),
                title,
                description,
                user,
                json,
            };
            run_share(&ctx, args).await?;
        }
        Commands::List { limit, json } => run_list(&ctx, limit, json).await?,
        Commands::Search { query, limit, json } => {
            run_search(&ctx, &query, limit, json).await?;
        }
        Commands::Start {
            id,
            auto_advance,
            json,
        } => run_start(&ctx, &id, auto_advance, json).await?,
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Server { command } => run_server(&ctx, command).await?,
        Commands::User { command } => run_user(&ctx, command)?,
        Commands::Cloud { command } => run_cloud(&ctx, command).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
