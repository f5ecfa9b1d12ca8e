use std::path::Path;

use quizshare_core::sharing::{ShareOutcome, ShareRequest};

use crate::commands::common::{read_source_quiz, resolve_user_name, AppContext};
use crate::error::CliError;

pub struct ShareArgs<'a> {
    pub file: Option<&'a Path>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub user: Option<String>,
    pub json: bool,
}

pub async fn run_share(ctx: &AppContext, args: ShareArgs<'_>) -> Result<(), CliError> {
    let source = read_source_quiz(args.file)?;
    let service = ctx.sharing_service()?;
    let user_name = resolve_user_name(args.user, service.user_name()?)?;

    let request = ShareRequest {
        title: args.title.unwrap_or_else(|| source.title.clone()),
        description: args
            .description
            .or_else(|| Some(source.description.clone())),
        user_name,
    };
    let outcome = service.share(&source, request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        match &outcome {
            ShareOutcome::Published { record } => {
                println!("Shared \"{}\" as {}", record.title, record.id);
            }
            ShareOutcome::SavedOffline { record, reason } => {
                println!("Saved \"{}\" offline as {} ({reason})", record.title, record.id);
                println!("It is available on this device; share again once the server is reachable.");
            }
        }
    }

    service.dispose().await;
    Ok(())
}
