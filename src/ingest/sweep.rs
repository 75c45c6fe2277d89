//! Full sweep: rebuild a family from the daily export file into staging
//! tables, then promote. Per-record failures are counted and skipped; only
//! auth failures and cancellation abort the build.

use anyhow::{bail, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ingest::loader::{MovieLoader, SeriesLoader};
use crate::ingest::normalize::{normalize_movie, normalize_series};
use crate::ingest::swap;
use crate::meta;
use crate::report::JobReport;
use crate::schema;
use crate::tmdb::export::{download_export, id_set};
use crate::tmdb::{Family, TmdbError};
use crate::JobContext;

const STAGING_PREFIX: &str = "staging_";
const PROGRESS_EVERY: u64 = 1000;

pub async fn full_sweep(
    ctx: &JobContext,
    force: bool,
    cancel: &CancellationToken,
) -> Result<JobReport> {
    let mut report = JobReport::default();
    for family in [Family::Movie, Family::Series] {
        let family_report = sweep_family(ctx, family, force, cancel).await?;
        report.merge(&family_report);
    }
    Ok(report)
}

async fn sweep_family(
    ctx: &JobContext,
    family: Family,
    force: bool,
    cancel: &CancellationToken,
) -> Result<JobReport> {
    let mut report = JobReport::default();

    let entries = download_export(&ctx.tmdb, family, cancel).await?;
    let mut ids: Vec<i64> = id_set(&entries, true).into_iter().collect();
    ids.sort_unstable();
    report.ids_enumerated = ids.len() as u64;
    info!(family = family.label(), ids = ids.len(), "starting full sweep build");

    schema::create_staging_tables(&ctx.db, family).await?;

    match family {
        Family::Movie => build_movies(ctx, &ids, cancel, &mut report).await?,
        Family::Series => build_series(ctx, &ids, cancel, &mut report).await?,
    }

    if !force && !swap::safe_to_promote(&ctx.db, family).await? {
        bail!(
            "aborting {} promotion: staging row count shrank past threshold (rerun with force to override)",
            family.label()
        );
    }
    swap::promote(&ctx.db, family).await?;

    meta::set_timestamp(
        &ctx.db.pool,
        &meta::family_key(meta::LAST_FULL_SWEEP, family),
        Utc::now(),
    )
    .await?;

    info!(family = family.label(), summary = %report.summary(), "full sweep family done");
    Ok(report)
}

async fn build_movies(
    ctx: &JobContext,
    ids: &[i64],
    cancel: &CancellationToken,
    report: &mut JobReport,
) -> Result<()> {
    let mut loader = MovieLoader::new(&ctx.db, STAGING_PREFIX, ctx.cfg.tmdb_batch_insert);
    let mut fetches = stream::iter(ids.iter().copied().map(|id| {
        let tmdb = ctx.tmdb.clone();
        let cancel = cancel.clone();
        async move { (id, tmdb.fetch_movie(id, &cancel).await) }
    }))
    .buffer_unordered(ctx.cfg.tmdb_max_connections as usize);

    let mut done = 0u64;
    while let Some((id, result)) = fetches.next().await {
        done += 1;
        match result {
            Ok(record) => {
                report.fetched += 1;
                loader.push(normalize_movie(record)).await?;
            }
            Err(TmdbError::NotFound) => {
                report.not_found += 1;
                debug!(id, "exported movie id returned 404");
            }
            Err(TmdbError::Cancelled) => bail!("full sweep cancelled"),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                report.errored += 1;
                warn!(id, error = %err, "movie fetch failed; skipping");
            }
        }
        if done % PROGRESS_EVERY == 0 {
            info!(done, total = ids.len(), "movie sweep progress");
        }
    }
    drop(fetches);

    report.inserted += loader.finish().await?;
    Ok(())
}

async fn build_series(
    ctx: &JobContext,
    ids: &[i64],
    cancel: &CancellationToken,
    report: &mut JobReport,
) -> Result<()> {
    let mut loader = SeriesLoader::new(&ctx.db, STAGING_PREFIX, ctx.cfg.tmdb_batch_insert);
    let mut fetches = stream::iter(ids.iter().copied().map(|id| {
        let tmdb = ctx.tmdb.clone();
        let cancel = cancel.clone();
        async move { (id, tmdb.fetch_series(id, &cancel).await) }
    }))
    .buffer_unordered(ctx.cfg.tmdb_max_connections as usize);

    let mut done = 0u64;
    while let Some((id, result)) = fetches.next().await {
        done += 1;
        match result {
            Ok(record) => {
                report.fetched += 1;
                loader.push(normalize_series(record)).await?;
            }
            Err(TmdbError::NotFound) => {
                report.not_found += 1;
                debug!(id, "exported series id returned 404");
            }
            Err(TmdbError::Cancelled) => bail!("full sweep cancelled"),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                report.errored += 1;
                warn!(id, error = %err, "series fetch failed; skipping");
            }
        }
        if done % PROGRESS_EVERY == 0 {
            info!(done, total = ids.len(), "series sweep progress");
        }
    }
    drop(fetches);

    report.inserted += loader.finish().await?;
    Ok(())
}
