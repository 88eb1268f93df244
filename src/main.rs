use anyhow::Context;

use clinic_records_lib::api::{start_api_server_on, ApiContext};
use clinic_records_lib::config::{self, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    clinic_records_lib::init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    tracing::info!(db_path = %config.db_path.display(), "Using clinic database");

    if !config.allow_registration {
        tracing::info!("Self-service registration disabled");
    }

    // Creates the database and runs migrations before accepting requests.
    let ctx = ApiContext::from_config(&config)?;
    let mut server = start_api_server_on(ctx, config.addr)
        .await
        .map_err(anyhow::Error::msg)?;

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for shutdown signal")?;
    server.shutdown();
    server.stopped().await;

    Ok(())
}
