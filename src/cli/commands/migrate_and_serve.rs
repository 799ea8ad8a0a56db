use anyhow::Result;
use tracing::{debug, info, trace};

use super::{init_database, serve};

pub async fn migrate_and_serve(
    database_url: &str,
    bind_address: &str,
    config_path: Option<&str>,
) -> Result<()> {
    trace!("Entering migrate_and_serve function");
    info!("Applying database migrations and starting server");
    debug!("Database URL: {}", database_url);

    init_database(database_url).await?;

    serve(database_url, bind_address, config_path).await
}
