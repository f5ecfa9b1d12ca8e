use crate::commands::common::{normalize_search_query, print_listing, AppContext};
use crate::error::CliError;

pub async fn run_search(
    ctx: &AppContext,
    query: &str,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let query = normalize_search_query(query)?;
    let service = ctx.sharing_service()?;
    let listing = service.search(&query).await?;
    print_listing(&listing, limit, as_json)?;
    service.dispose().await;
    Ok(())
}
