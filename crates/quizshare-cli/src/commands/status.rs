use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_status(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let service = ctx.sharing_service()?;
    let report = service.initialize().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Server: {}", report.server);
        println!("Mode:   {}", report.state.mode());
        println!(
            "User:   {}",
            report.user_name.as_deref().unwrap_or("(not set)")
        );
        if report.first_run {
            println!();
            println!("No quiz server found. To share with your class:");
            println!("  quizshare server discover          look for a server on this network");
            println!("  quizshare server set <address>     e.g. 192.168.1.5:3000");
            println!("Quizzes you share meanwhile are kept on this device.");
            // Shown once; later runs only print the summary.
            service.mark_onboarded()?;
        }
    }

    service.dispose().await;
    Ok(())
}
