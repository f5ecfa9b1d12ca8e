use crate::commands::common::{print_listing, AppContext};
use crate::error::CliError;

pub async fn run_list(ctx: &AppContext, limit: usize, as_json: bool) -> Result<(), CliError> {
    let service = ctx.sharing_service()?;
    let listing = service.list().await?;
    print_listing(&listing, limit, as_json)?;
    service.dispose().await;
    Ok(())
}
