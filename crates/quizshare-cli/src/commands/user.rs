use crate::cli::UserCommands;
use crate::commands::common::AppContext;
use crate::error::CliError;

pub fn run_user(ctx: &AppContext, command: UserCommands) -> Result<(), CliError> {
    let service = ctx.sharing_service()?;
    match command {
        UserCommands::Show => match service.user_name()? {
            Some(name) => println!("{name}"),
            None => println!("No user name saved"),
        },
        UserCommands::Set { name } => {
            let saved = service.set_user_name(&name)?;
            println!("User name set to {saved}");
        }
    }
    Ok(())
}
