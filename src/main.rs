//! Worker process: ensures schema, registers CRON schedules, listens on the
//! job queue, and drains gracefully on SIGTERM/Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use tmdb_mirror::config::Config;
use tmdb_mirror::db::Db;
use tmdb_mirror::jobs::scheduler::Scheduler;
use tmdb_mirror::logging::init_tracing;
use tmdb_mirror::notify::Notifier;
use tmdb_mirror::tmdb::{RequestGate, TmdbClient};
use tmdb_mirror::{schema, JobContext};

/// Pool headroom beyond the fetch pipeline: scheduler, queue listener,
/// metadata writes.
const POOL_OVERHEAD: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env().context("configuration error")?;
    init_tracing(&cfg);
    info!("starting TMDB mirror worker");

    let db = Db::connect(&cfg.database_uri, cfg.tmdb_max_connections + POOL_OVERHEAD)
        .await
        .context("database connection failed")?;

    schema::create_live_tables(&db).await?;
    if cfg.enable_unaccent {
        schema::apply_unaccent(&db).await?;
    }
    schema::init_job_queue(&db).await?;

    let gate = Arc::new(RequestGate::new(
        cfg.tmdb_rate_limit,
        cfg.tmdb_max_connections,
    ));
    let cfg = Arc::new(cfg);
    let tmdb = TmdbClient::new(&cfg, gate)?;
    let notifier = Notifier::from_config(&cfg);

    let ctx = JobContext {
        db,
        cfg: cfg.clone(),
        tmdb,
        notifier,
    };

    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(ctx, cancel.clone());
    let active = scheduler.spawn_cron_jobs()?;
    info!(active_schedules = active, "cron schedules registered");

    let queue = scheduler.clone();
    let queue_handle = tokio::spawn(async move { queue.run_queue_loop().await });

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutdown: interrupt received"),
        _ = sigterm.recv() => info!("shutdown: SIGTERM received"),
    }

    scheduler
        .shutdown(Duration::from_secs(cfg.shutdown_grace_secs))
        .await;
    queue_handle.abort();
    info!("worker stopped");
    Ok(())
}
