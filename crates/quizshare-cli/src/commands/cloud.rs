use std::path::Path;
use std::time::Duration;

use quizshare_core::sync::{CloudSyncClient, SyncPoller};
use quizshare_core::QuizRecord;

use crate::cli::CloudCommands;
use crate::commands::common::{
    format_quiz_lines, normalize_search_query, quiz_to_list_item, read_source_quiz,
    resolve_user_name, AppContext, QuizListItem,
};
use crate::error::CliError;

pub async fn run_cloud(ctx: &AppContext, command: CloudCommands) -> Result<(), CliError> {
    let client = ctx.cloud_client()?;
    match command {
        CloudCommands::Sync { json } => {
            let quizzes = client.pull().await?;
            if json {
                print_items(&quizzes)?;
            } else {
                println!("{} quizzes in the community collection", quizzes.len());
            }
        }
        CloudCommands::List { limit, json } => {
            let quizzes = client.local()?;
            let quizzes = &quizzes[..quizzes.len().min(limit)];
            if json {
                print_items(quizzes)?;
            } else if quizzes.is_empty() {
                println!("No cached cloud quizzes. Run `quizshare cloud sync` first.");
            } else {
                for line in format_quiz_lines(quizzes) {
                    println!("{line}");
                }
            }
        }
        CloudCommands::Search { query, json } => {
            let query = normalize_search_query(&query)?;
            let quizzes = client.search(&query).await?;
            if json {
                print_items(&quizzes)?;
            } else if quizzes.is_empty() {
                println!("No quizzes match \"{query}\"");
            } else {
                for line in format_quiz_lines(&quizzes) {
                    println!("{line}");
                }
            }
        }
        CloudCommands::Share {
            file,
            title,
            user,
            json,
        } => run_cloud_share(ctx, &client, file.as_deref(), title, user, json).await?,
        CloudCommands::Watch { interval } => {
            let interval = interval.map_or_else(|| ctx.config.sync_interval(), Duration::from_secs);
            if interval.is_zero() {
                return Err(CliError::Config("interval must be at least 1 second".to_string()));
            }
            println!(
                "Syncing with {} every {}s. Press Ctrl+C to stop.",
                client.endpoint(),
                interval.as_secs()
            );
            let poller = SyncPoller::start(client, interval);
            tokio::signal::ctrl_c().await?;
            println!("Stopping; uploading local changes...");
            poller.shutdown().await;
        }
    }
    Ok(())
}

async fn run_cloud_share(
    ctx: &AppContext,
    client: &CloudSyncClient,
    file: Option<&Path>,
    title: Option<String>,
    user: Option<String>,
    as_json: bool,
) -> Result<(), CliError> {
    let mut source = read_source_quiz(file)?;
    if let Some(title) = title {
        source.title = title;
    }
    let service = ctx.sharing_service()?;
    let user_name = resolve_user_name(user, service.user_name()?)?;

    let (record, written) = client.share_local(&source, &user_name).await?;
    // Upload in the foreground so the process does not exit mid-request.
    client.push_now(&written).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&quiz_to_list_item(&record))?);
    } else {
        println!("Shared \"{}\" to the cloud as {}", record.title, record.id);
    }
    Ok(())
}

fn print_items(quizzes: &[QuizRecord]) -> Result<(), CliError> {
    let items = quizzes.iter().map(quiz_to_list_item).collect::<Vec<QuizListItem>>();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
