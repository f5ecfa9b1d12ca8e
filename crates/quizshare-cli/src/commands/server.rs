use quizshare_core::lan::LanServerClient;

use crate::cli::ServerCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_server(ctx: &AppContext, command: ServerCommands) -> Result<(), CliError> {
    let service = ctx.sharing_service()?;
    match command {
        ServerCommands::Set { address } => {
            let info = service.configure_server_url(&address).await?;
            println!("Connected to {}", service.server_url().await);
            if !info.ip_addresses.is_empty() {
                println!("Server addresses: {}", info.ip_addresses.join(", "));
            }
        }
        ServerCommands::Clear => {
            let fallback = service.clear_server_url().await?;
            println!("Saved server cleared; using {fallback}");
        }
        ServerCommands::Discover => {
            println!("Looking for a quiz server on the local network...");
            match service.discover_server().await? {
                Some(found) => println!("Found and saved {}", found.server),
                None => {
                    println!("No server answered. Run `quizshare server set <address>` with the address shown by the server.");
                }
            }
        }
        ServerCommands::Info { json } => {
            let client = LanServerClient::new(service.server_url().await, ctx.config.timeouts)?;
            let info = client.server_info().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Server: {}", client.server());
                println!("Port:   {}", info.port);
                for address in &info.ip_addresses {
                    println!("  http://{address}:{}", info.port);
                }
            }
        }
    }
    Ok(())
}
