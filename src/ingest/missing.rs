//! Export-file reconciliation: insert ids the mirror is missing, prune ids
//! the upstream no longer exports. Together they converge the live root set
//! onto the export set.

use std::collections::HashSet;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db::Db;
use crate::ingest::upsert::{delete_records, refresh_movie, refresh_series, Refresh};
use crate::report::JobReport;
use crate::tmdb::export::{download_export, id_set};
use crate::tmdb::{Family, TmdbError};
use crate::JobContext;

/// Ids present upstream but absent locally, in stable order.
pub fn missing_in_live(export: &HashSet<i64>, live: &HashSet<i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = export.difference(live).copied().collect();
    ids.sort_unstable();
    ids
}

/// Ids present locally but dropped from the export, in stable order.
pub fn orphaned_in_live(export: &HashSet<i64>, live: &HashSet<i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = live.difference(export).copied().collect();
    ids.sort_unstable();
    ids
}

async fn live_id_set(db: &Db, family: Family) -> Result<HashSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(&format!("SELECT id FROM {}", family.root_table()))
        .fetch_all(&db.pool)
        .await?;
    Ok(ids.into_iter().collect())
}

pub async fn update_missing_ids(ctx: &JobContext, cancel: &CancellationToken) -> Result<JobReport> {
    let mut report = JobReport::default();
    for family in [Family::Movie, Family::Series] {
        let family_report = missing_for_family(ctx, family, cancel).await?;
        report.merge(&family_report);
    }
    Ok(report)
}

async fn missing_for_family(
    ctx: &JobContext,
    family: Family,
    cancel: &CancellationToken,
) -> Result<JobReport> {
    let mut report = JobReport::default();

    let entries = download_export(&ctx.tmdb, family, cancel).await?;
    let export_ids = id_set(&entries, true);
    let live_ids = live_id_set(&ctx.db, family).await?;
    let missing = missing_in_live(&export_ids, &live_ids);
    report.ids_enumerated = missing.len() as u64;
    info!(family = family.label(), missing = missing.len(), "missing ids computed");

    let mut refreshes = stream::iter(missing.into_iter().map(|id| {
        let ctx = ctx.clone();
        let cancel = cancel.clone();
        async move {
            let outcome = match family {
                Family::Movie => refresh_movie(&ctx, id, &cancel).await,
                Family::Series => refresh_series(&ctx, id, &cancel).await,
            };
            (id, outcome)
        }
    }))
    .buffer_unordered(ctx.cfg.tmdb_max_connections as usize);

    while let Some((id, outcome)) = refreshes.next().await {
        match outcome {
            Ok(Refresh::Applied) => {
                report.fetched += 1;
                report.inserted += 1;
            }
            Ok(Refresh::NotFound) => {
                // Exported but gone by fetch time; prune will catch up.
                report.not_found += 1;
            }
            Err(err) => {
                if let Some(tmdb_err) = err.downcast_ref::<TmdbError>() {
                    if tmdb_err.is_fatal() {
                        return Err(err);
                    }
                    if matches!(tmdb_err, TmdbError::Cancelled) {
                        anyhow::bail!("missing ids sweep cancelled");
                    }
                }
                report.errored += 1;
                warn!(id, family = family.label(), error = %err, "missing id fetch failed; skipping");
            }
        }
    }
    drop(refreshes);

    info!(family = family.label(), summary = %report.summary(), "missing ids family done");
    Ok(report)
}

pub async fn prune_deleted(ctx: &JobContext, cancel: &CancellationToken) -> Result<JobReport> {
    let mut report = JobReport::default();
    for family in [Family::Movie, Family::Series] {
        // Pruning compares against every exported id, adult included: an id
        // the upstream still publishes is not an orphan.
        let entries = download_export(&ctx.tmdb, family, cancel).await?;
        let export_ids = id_set(&entries, false);
        let live_ids = live_id_set(&ctx.db, family).await?;
        let orphans = orphaned_in_live(&export_ids, &live_ids);
        report.ids_enumerated += orphans.len() as u64;
        info!(family = family.label(), orphans = orphans.len(), "orphaned ids computed");

        report.deleted += delete_records(&ctx.db, family, &orphans).await?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_difference_both_directions() {
        let export: HashSet<i64> = [1, 2, 3, 4].into_iter().collect();
        let live: HashSet<i64> = [3, 4, 5, 6].into_iter().collect();
        assert_eq!(missing_in_live(&export, &live), vec![1, 2]);
        assert_eq!(orphaned_in_live(&export, &live), vec![5, 6]);
    }

    #[test]
    fn missing_then_prune_converges_live_onto_export() {
        let export: HashSet<i64> = [10, 20, 30].into_iter().collect();
        let mut live: HashSet<i64> = [20, 40].into_iter().collect();

        for id in missing_in_live(&export, &live) {
            live.insert(id);
        }
        for id in orphaned_in_live(&export, &live) {
            live.remove(&id);
        }
        assert_eq!(live, export);
    }

    #[test]
    fn equal_sets_produce_no_work() {
        let export: HashSet<i64> = [1, 2].into_iter().collect();
        let live = export.clone();
        assert!(missing_in_live(&export, &live).is_empty());
        assert!(orphaned_in_live(&export, &live).is_empty());
    }
}
