//! Incremental reconciliation against the upstream `/changes` feed.
//! The look-back window adapts to how long ago the last successful sync ran,
//! capped at the ~14 days the upstream retains.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ingest::upsert::{delete_records, refresh_movie, refresh_series, Refresh};
use crate::meta;
use crate::report::JobReport;
use crate::tmdb::changes::fetch_changed_ids;
use crate::tmdb::{Family, TmdbError};
use crate::JobContext;

const LOOKBACK_CAP_DAYS: i64 = 14;

/// `[start, end]` for the `/changes` query.
pub fn changes_window(
    now: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let floor = now - ChronoDuration::days(LOOKBACK_CAP_DAYS);
    match last {
        Some(last) if now - last <= ChronoDuration::hours(24) => {
            (now - ChronoDuration::hours(24), now)
        }
        Some(last) => (last.max(floor), now),
        None => (floor, now),
    }
}

pub async fn changes_sync(ctx: &JobContext, cancel: &CancellationToken) -> Result<JobReport> {
    let mut report = JobReport::default();
    for family in [Family::Movie, Family::Series] {
        let family_report = sync_family(ctx, family, cancel).await?;
        report.merge(&family_report);
    }
    Ok(report)
}

async fn sync_family(
    ctx: &JobContext,
    family: Family,
    cancel: &CancellationToken,
) -> Result<JobReport> {
    let mut report = JobReport::default();
    let pool = &ctx.db.pool;
    let now = Utc::now();
    let sync_key = meta::family_key(meta::LAST_CHANGES_SYNC, family);

    // A sweep within the last day already rebuilt everything this window
    // could cover.
    let sweep_key = meta::family_key(meta::LAST_FULL_SWEEP, family);
    if let Some(last_sweep) = meta::get_timestamp(pool, &sweep_key).await? {
        if now - last_sweep < ChronoDuration::hours(24) {
            info!(
                family = family.label(),
                "skipping changes sync: full sweep ran within the last 24 hours"
            );
            meta::set_timestamp(pool, &sync_key, now).await?;
            return Ok(report);
        }
    }

    let last_sync = meta::get_timestamp(pool, &sync_key).await?;
    let (start, end) = changes_window(now, last_sync);
    info!(
        family = family.label(),
        start = %start.format("%Y-%m-%d"),
        end = %end.format("%Y-%m-%d"),
        "fetching changed ids"
    );

    let ids = fetch_changed_ids(&ctx.tmdb, family, start.date_naive(), end.date_naive(), cancel)
        .await?;
    report.ids_enumerated = ids.len() as u64;
    info!(family = family.label(), changed = ids.len(), "changed ids enumerated");

    let mut deleted_ids: Vec<i64> = Vec::new();
    let mut refreshes = stream::iter(ids.into_iter().map(|id| {
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
                report.updated += 1;
            }
            Ok(Refresh::NotFound) => {
                report.not_found += 1;
                deleted_ids.push(id);
            }
            Err(err) => {
                if let Some(tmdb_err) = err.downcast_ref::<TmdbError>() {
                    if tmdb_err.is_fatal() {
                        return Err(err);
                    }
                    if matches!(tmdb_err, TmdbError::Cancelled) {
                        anyhow::bail!("changes sync cancelled");
                    }
                }
                report.errored += 1;
                warn!(id, family = family.label(), error = %err, "change refresh failed; skipping");
            }
        }
    }
    drop(refreshes);

    if !deleted_ids.is_empty() {
        report.deleted += delete_records(&ctx.db, family, &deleted_ids).await?;
        info!(
            family = family.label(),
            count = deleted_ids.len(),
            "removed records that 404ed upstream"
        );
    }

    meta::set_timestamp(pool, &sync_key, now).await?;
    info!(family = family.label(), summary = %report.summary(), "changes sync family done");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn recent_sync_uses_a_fixed_day_window() {
        let now = at(2026, 8, 2, 12);
        let last = at(2026, 8, 2, 3);
        let (start, end) = changes_window(now, Some(last));
        assert_eq!(start, now - ChronoDuration::hours(24));
        assert_eq!(end, now);
    }

    #[test]
    fn exactly_24h_ago_still_counts_as_recent() {
        let now = at(2026, 8, 2, 12);
        let last = now - ChronoDuration::hours(24);
        let (start, _) = changes_window(now, Some(last));
        assert_eq!(start, now - ChronoDuration::hours(24));
    }

    #[test]
    fn stale_sync_resumes_from_last_run() {
        let now = at(2026, 8, 2, 12);
        let last = at(2026, 7, 28, 12); // five days
        let (start, end) = changes_window(now, Some(last));
        assert_eq!(start, last);
        assert_eq!(end, now);
    }

    #[test]
    fn lookback_is_capped_at_fourteen_days() {
        let now = at(2026, 8, 2, 12);
        let last = at(2026, 6, 1, 0);
        let (start, _) = changes_window(now, Some(last));
        assert_eq!(start, now - ChronoDuration::days(14));
    }

    #[test]
    fn unset_sync_uses_full_lookback() {
        let now = at(2026, 8, 2, 12);
        let (start, end) = changes_window(now, None);
        assert_eq!(start, now - ChronoDuration::days(14));
        assert_eq!(end, now);
    }
}
