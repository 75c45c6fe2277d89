//! REST frontend entry point.

use anyhow::{Context, Result};
use tracing::info;

use tmdb_mirror::api::server::ApiServer;
use tmdb_mirror::config::Config;
use tmdb_mirror::db::Db;
use tmdb_mirror::logging::init_tracing;
use tmdb_mirror::schema;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env().context("configuration error")?;
    init_tracing(&cfg);

    if !cfg.api_enabled {
        info!("API is disabled; set API_ENABLED=true to enable");
        return Ok(());
    }

    let db = Db::connect(&cfg.database_uri, 5).await?;
    // The worker normally creates this; ensure it exists so enqueues don't
    // fail when the API comes up first.
    schema::init_job_queue(&db).await?;

    ApiServer::from_config(&cfg).run(db.pool).await
}
